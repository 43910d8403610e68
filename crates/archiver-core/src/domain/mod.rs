//! 수집 및 아카이브를 위한 도메인 모델.

mod market_data;
mod partition;
mod record;

pub use market_data::*;
pub use partition::*;
pub use record::*;
