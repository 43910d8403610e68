//! Partitioned market data archiver.
//!
//! 이 crate는 거래소 API에서 데이터를 수집해 날짜별 압축 아카이브로 보관합니다:
//! - 커서 기반 페이지 수집 (kline / trade 정책)
//! - 메모리 버퍼 + CSV 싱크
//! - 심볼 전체 순회
//! - 파티션 단위 아카이브 (존재 확인 → 수집 → 압축 → 업로드 → 정리)

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;
pub mod storage;

pub use config::{CollectorConfig, FetchConfig, OrchestratorConfig, StoreConfig};
pub use error::{CollectorError, Result};
pub use stats::CollectionStats;
