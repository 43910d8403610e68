//! 거래소 시장 데이터 소스.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - MarketDataSource trait: `since + limit` 페이지 질의 계약
//! - FetchOutcome: 빈 페이지 / 일시적 에러 / 치명적 에러를 구분하는 태그 결과
//! - 지수 백오프 재시도 정책
//! - Binance 공개 REST 커넥터

pub mod connector;
pub mod error;
pub mod retry;
pub mod traits;

pub use connector::binance::{BinanceClient, BinanceConfig};
pub use error::*;
pub use retry::{Backoff, RetryConfig};
pub use traits::*;
