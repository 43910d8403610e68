//! # Archiver Core
//!
//! 시장 데이터 아카이버의 핵심 도메인 타입을 제공합니다.
//!
//! 이 크레이트는 수집 파이프라인 전반에서 사용되는 기본 타입을 제공합니다:
//! - 타임프레임 및 반개구간 시간 윈도우
//! - 거래소 측 캔들/체결 데이터
//! - CSV 아카이브 행 (kline / trade)
//! - 파티션 식별자와 원격 파티션 인덱스
//! - 로깅 인프라

pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
