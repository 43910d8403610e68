//! 핵심 도메인 에러 타입.

use thiserror::Error;

/// 도메인 타입 생성/파싱 에러.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// 시작이 종료보다 늦은 시간 윈도우
    #[error("Invalid time window: start {start} > end {end}")]
    InvalidWindow { start: i64, end: i64 },

    /// 문자열 파싱 실패
    #[error("Parse error: {0}")]
    Parse(String),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
