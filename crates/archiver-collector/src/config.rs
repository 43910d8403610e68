//! 환경변수 기반 설정 모듈.

use std::path::PathBuf;
use std::str::FromStr;

use archiver_core::{Frequency, Timeframe, ONE_HOUR_MS};
use archiver_exchange::{BinanceConfig, RetryConfig};
use secrecy::SecretString;

use crate::error::CollectorError;
use crate::Result;

/// Collector 전체 설정
#[derive(Debug)]
pub struct CollectorConfig {
    /// 원격 저장소 설정
    pub store: StoreConfig,
    /// 파티션 오케스트레이터 설정
    pub orchestrator: OrchestratorConfig,
    /// 캔들 수집 설정
    pub kline: FetchConfig,
    /// 체결 수집 설정
    pub trade: FetchConfig,
    /// Binance 연결 설정
    pub binance: BinanceConfig,
}

/// 원격 아카이브 저장소 설정
#[derive(Debug)]
pub enum StoreConfig {
    /// 마운트된 디렉토리
    Local { root: PathBuf },
    /// HTTP 파일 서버
    Http {
        base_url: String,
        token: Option<SecretString>,
    },
}

/// 파티션 오케스트레이터 설정
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// CSV/아카이브 임시 작업 디렉토리
    pub work_dir: PathBuf,
    /// 캔들 타임프레임 (파일명에도 사용)
    pub timeframe: Timeframe,
    /// 파티션 주기
    pub frequency: Frequency,
    /// 파티션마다 인덱스를 다시 조회할지 여부
    pub refresh_index: bool,
    /// 진행 바 표시 여부
    pub show_progress: bool,
    /// xz 압축 레벨 (0-9)
    pub compression_level: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("data/work"),
            timeframe: Timeframe::M1,
            frequency: Frequency::Daily,
            refresh_index: false,
            show_progress: true,
            compression_level: 6,
        }
    }
}

/// 페이지 수집기 + 버퍼 설정 (정책마다 하나)
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// 버퍼가 이 크기에 도달하면 싱크로 flush
    pub flush_threshold: usize,
    /// 요청당 최대 레코드 수
    pub page_size: u32,
    /// 일시적 에러 재시도 백오프
    pub backoff: RetryConfig,
    /// 심볼당 최대 반복 횟수 (재시도 포함)
    pub iteration_cap: usize,
    /// 체결 수집 정체 시 커서 전진 간격 (밀리초)
    pub stall_gap_ms: i64,
}

impl FetchConfig {
    /// 캔들 기본값: 페이지 500, 반복 1000회.
    pub fn kline_defaults() -> Self {
        Self {
            flush_threshold: 10_000,
            page_size: 500,
            backoff: RetryConfig::default(),
            iteration_cap: 1_000,
            stall_gap_ms: ONE_HOUR_MS,
        }
    }

    /// 체결 기본값: 페이지 1000, 반복 10000회.
    pub fn trade_defaults() -> Self {
        Self {
            flush_threshold: 10_000,
            page_size: 1_000,
            backoff: RetryConfig::default(),
            iteration_cap: 10_000,
            stall_gap_ms: ONE_HOUR_MS,
        }
    }

    /// `{prefix}_PAGE_SIZE` 등 접두사가 붙은 환경변수로 기본값을 덮어씁니다.
    fn from_env_with(prefix: &str, defaults: Self, backoff: &RetryConfig) -> Self {
        Self {
            flush_threshold: env_var_parse(
                &format!("{prefix}_FLUSH_THRESHOLD"),
                defaults.flush_threshold,
            ),
            page_size: env_var_parse(&format!("{prefix}_PAGE_SIZE"), defaults.page_size),
            backoff: backoff.clone(),
            iteration_cap: env_var_parse(
                &format!("{prefix}_ITERATION_CAP"),
                defaults.iteration_cap,
            ),
            stall_gap_ms: defaults.stall_gap_ms,
        }
    }
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let store = match std::env::var("ARCHIVE_STORE_URL") {
            Ok(base_url) if !base_url.trim().is_empty() => StoreConfig::Http {
                base_url: base_url.trim_end_matches('/').to_string(),
                token: std::env::var("ARCHIVE_STORE_TOKEN")
                    .ok()
                    .filter(|t| !t.is_empty())
                    .map(|t| SecretString::new(t.into())),
            },
            _ => StoreConfig::Local {
                root: PathBuf::from(env_var_or("ARCHIVE_STORE_DIR", "data/archive")),
            },
        };

        let compression_level: u32 = env_var_parse("ARCHIVE_COMPRESSION_LEVEL", 6);
        if compression_level > 9 {
            return Err(CollectorError::Config(format!(
                "ARCHIVE_COMPRESSION_LEVEL은 0-9 범위여야 합니다: {}",
                compression_level
            )));
        }

        let orchestrator = OrchestratorConfig {
            work_dir: PathBuf::from(env_var_or("ARCHIVE_WORK_DIR", "data/work")),
            timeframe: env_var_strict("ARCHIVE_TIMEFRAME", Timeframe::M1)?,
            frequency: env_var_strict("ARCHIVE_FREQUENCY", Frequency::Daily)?,
            refresh_index: env_var_bool("ARCHIVE_REFRESH_INDEX", false),
            show_progress: env_var_bool("ARCHIVE_SHOW_PROGRESS", true),
            compression_level,
        };

        let backoff = RetryConfig {
            initial_delay_ms: env_var_parse("FETCH_BACKOFF_INITIAL_MS", 1_000),
            max_delay_ms: env_var_parse("FETCH_BACKOFF_MAX_MS", 60_000),
            multiplier: env_var_parse("FETCH_BACKOFF_MULTIPLIER", 2.0),
        };

        Ok(Self {
            store,
            orchestrator,
            kline: FetchConfig::from_env_with("KLINE", FetchConfig::kline_defaults(), &backoff),
            trade: FetchConfig::from_env_with("TRADE", FetchConfig::trade_defaults(), &backoff),
            binance: BinanceConfig::from_env(),
        })
    }
}

/// 환경변수 문자열 (없으면 기본값)
fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 환경변수에서 값을 파싱 (값이 있는데 잘못되었으면 에러)
fn env_var_strict<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(v) => v
            .parse()
            .map_err(|e| CollectorError::Config(format!("{}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

/// 환경변수에서 bool 값 파싱
fn env_var_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}
