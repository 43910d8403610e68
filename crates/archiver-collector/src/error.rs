//! 에러 타입 정의.

use archiver_core::CoreError;
use archiver_exchange::ExchangeError;
use thiserror::Error;

/// Collector 에러 타입
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),

    /// 도메인 타입 에러 (잘못된 윈도우 등)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// 데이터 소스 에러 (재시도 불가)
    #[error("Data source error: {0}")]
    Exchange(#[from] ExchangeError),

    /// 심볼 목록 조회 실패 (실행 전체 중단)
    #[error("Symbol enumeration failed: {0}")]
    SymbolEnumeration(ExchangeError),

    /// 일부 심볼을 끝까지 수집하지 못함 (파티션 아카이브 거부)
    #[error("Incomplete fetch, {} symbol(s) failed: {}", .failed.len(), .failed.join(", "))]
    IncompleteFetch { failed: Vec<String> },

    /// CSV 싱크 에러
    #[error("Sink error: {0}")]
    Sink(String),

    /// 파일 입출력 에러
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 압축 에러
    #[error("Archive error: {0}")]
    Archive(String),

    /// 원격 저장소 에러
    #[error("Upload error: {0}")]
    Upload(String),

    /// 파티션 처리 실패
    #[error("Partition {partition} failed: {source}")]
    Partition {
        partition: String,
        #[source]
        source: Box<CollectorError>,
    },
}

impl CollectorError {
    /// 파티션 이름을 붙여 감쌉니다.
    pub fn in_partition(self, partition: impl Into<String>) -> Self {
        Self::Partition {
            partition: partition.into(),
            source: Box::new(self),
        }
    }
}

impl From<csv::Error> for CollectorError {
    fn from(err: csv::Error) -> Self {
        Self::Sink(err.to_string())
    }
}

impl From<reqwest::Error> for CollectorError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upload(err.to_string())
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
