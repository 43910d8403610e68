//! 로컬 기록, 압축, 원격 저장소.

pub mod archive;
pub mod buffer;
pub mod http_store;
pub mod local_store;
pub mod sink;
pub mod store;

pub use buffer::BufferedWriter;
pub use http_store::HttpStore;
pub use local_store::LocalDirStore;
pub use sink::{CsvSink, MemorySink, RecordSink};
pub use store::RemoteStore;
