//! 수집 파이프라인 모듈.

pub mod driver;
pub mod fetcher;
pub mod orchestrator;

pub use driver::{is_spot_symbol, DriveReport, SymbolSetDriver};
pub use fetcher::{FetchPolicy, FetchReport, KlinePolicy, TradePolicy};
pub use orchestrator::{PartitionOrchestrator, PartitionOutcome};
