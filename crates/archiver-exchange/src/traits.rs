//! 페이지 단위 시장 데이터 소스 trait.

use async_trait::async_trait;
use std::collections::BTreeSet;

use archiver_core::{Kline, Timeframe, TradeTick};

use crate::ExchangeError;

/// 거래소 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// `since + limit` 계약을 따르는 시장 데이터 소스.
///
/// 페이지는 `since` 이후의 레코드를 오름차순으로 최대 `limit`개 반환합니다.
/// 에러는 [`ExchangeError::is_retryable`]로 일시적/치명적 종류가 구분되어야 합니다.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// 거래소 이름 (파티션 파일명에 사용).
    fn name(&self) -> &str;

    /// 거래 가능한 모든 심볼 (통합 표기, 예: "BTC/USDT").
    async fn list_symbols(&self) -> ExchangeResult<BTreeSet<String>>;

    /// 캔들 한 페이지 조회.
    async fn fetch_klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: i64,
        limit: u32,
    ) -> ExchangeResult<Vec<Kline>>;

    /// 체결 한 페이지 조회.
    async fn fetch_trades(&self, symbol: &str, since: i64, limit: u32)
        -> ExchangeResult<Vec<TradeTick>>;
}

/// 페이지 조회 결과.
///
/// "더 이상 데이터 없음"과 "요청 실패"를 타입으로 구분합니다.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    /// 비어 있지 않은 페이지
    Page(Vec<T>),
    /// 빈 페이지
    Empty,
    /// 같은 커서로 재시도할 수 있는 에러
    Transient(ExchangeError),
    /// 재시도해도 소용없는 에러
    Fatal(ExchangeError),
}

impl<T> From<ExchangeResult<Vec<T>>> for FetchOutcome<T> {
    fn from(result: ExchangeResult<Vec<T>>) -> Self {
        match result {
            Ok(records) if records.is_empty() => FetchOutcome::Empty,
            Ok(records) => FetchOutcome::Page(records),
            Err(e) if e.is_retryable() => FetchOutcome::Transient(e),
            Err(e) => FetchOutcome::Fatal(e),
        }
    }
}
