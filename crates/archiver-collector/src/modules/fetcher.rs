//! 커서 기반 페이지 수집기.
//!
//! 소스는 `since` 이후 최대 `limit`개의 레코드만 오름차순으로 돌려주므로,
//! 윈도우 전체를 얻으려면 커서를 옮겨가며 반복 조회해야 합니다.
//!
//! - 캔들: 커서를 페이지의 마지막 봉으로 옮깁니다. 빈 페이지에서 종료합니다.
//! - 체결: 빈 페이지나 같은 마지막 체결 ID가 반복되면 커서를 한 시간 전진시킵니다.
//!
//! 일시적 에러는 같은 커서로 재시도하되 반복 횟수를 소모합니다.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use archiver_core::{ArchiveRecord, KlineRecord, Timeframe, TimeWindow, TradeRecord};
use archiver_exchange::{Backoff, FetchOutcome, MarketDataSource};

use crate::config::FetchConfig;
use crate::error::CollectorError;
use crate::storage::BufferedWriter;
use crate::Result;

/// 심볼 하나의 수집 결과.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchReport {
    pub symbol: String,
    /// 소모한 반복 횟수 (재시도 포함)
    pub iterations: usize,
    /// 받은 비어 있지 않은 페이지 수
    pub pages: usize,
    /// writer로 넘긴 레코드 수
    pub records: usize,
    /// 일시적 에러 재시도 횟수
    pub retries: usize,
    /// 정체로 인한 커서 전진 횟수
    pub stall_jumps: usize,
    /// 종료 시점의 커서
    pub final_cursor: i64,
    /// 윈도우 끝에 닿기 전에 반복 상한에 걸렸는지
    pub budget_exhausted: bool,
    /// 치명적 에러로 심볼을 포기한 경우 그 사유
    pub failure: Option<String>,
}

impl FetchReport {
    fn new(symbol: &str, cursor: i64) -> Self {
        Self {
            symbol: symbol.to_string(),
            final_cursor: cursor,
            ..Default::default()
        }
    }
}

/// 데이터 종류별 수집 정책.
#[async_trait]
pub trait FetchPolicy: Send + Sync {
    /// 기록되는 행 타입
    type Record: ArchiveRecord;

    /// 정책 이름 (로그용)
    fn name(&self) -> &'static str;

    /// 심볼 하나의 윈도우 전체를 수집해 writer에 기록합니다.
    async fn fetch_symbol(
        &self,
        symbol: &str,
        window: TimeWindow,
        writer: &mut BufferedWriter<Self::Record>,
    ) -> Result<FetchReport>;
}

/// 캔들 수집 정책.
pub struct KlinePolicy {
    source: Arc<dyn MarketDataSource>,
    timeframe: Timeframe,
    config: FetchConfig,
}

impl KlinePolicy {
    pub fn new(source: Arc<dyn MarketDataSource>, timeframe: Timeframe, config: FetchConfig) -> Self {
        Self {
            source,
            timeframe,
            config,
        }
    }
}

#[async_trait]
impl FetchPolicy for KlinePolicy {
    type Record = KlineRecord;

    fn name(&self) -> &'static str {
        "kline"
    }

    async fn fetch_symbol(
        &self,
        symbol: &str,
        window: TimeWindow,
        writer: &mut BufferedWriter<KlineRecord>,
    ) -> Result<FetchReport> {
        let mut report = FetchReport::new(symbol, window.start());
        let mut backoff = Backoff::new(self.config.backoff.clone());
        let mut cursor = window.start();
        let mut last_written: Option<i64> = None;

        while cursor < window.end() {
            if report.iterations >= self.config.iteration_cap {
                report.budget_exhausted = true;
                info!(
                    symbol,
                    cursor,
                    end = window.end(),
                    iterations = report.iterations,
                    "반복 상한 도달, 남은 구간 생략"
                );
                break;
            }
            report.iterations += 1;

            let result = self
                .source
                .fetch_klines(symbol, self.timeframe, cursor, self.config.page_size)
                .await;

            match FetchOutcome::from(result) {
                FetchOutcome::Page(mut klines) => {
                    backoff.reset();
                    klines.sort_by_key(|k| k.open_time);

                    let page_last = klines.last().map(|k| k.open_time).unwrap_or(cursor);
                    // 커서 위치의 봉은 직전 페이지에도 있었다
                    let fresh: Vec<KlineRecord> = klines
                        .into_iter()
                        .filter(|k| last_written.map_or(true, |t| k.open_time > t))
                        .map(KlineRecord::from)
                        .collect();

                    report.pages += 1;
                    report.records += fresh.len();
                    if let Some(last) = fresh.last() {
                        last_written = Some(last.timestamp);
                    }
                    writer.write(fresh, true)?;

                    if page_last <= cursor {
                        debug!(symbol, cursor, "커서가 더 나아가지 않음, 종료");
                        break;
                    }
                    cursor = page_last;
                }
                FetchOutcome::Empty => {
                    debug!(symbol, cursor, "빈 페이지, 종료");
                    break;
                }
                FetchOutcome::Transient(e) => {
                    report.retries += 1;
                    let delay = backoff.next_delay_for(&e);
                    warn!(
                        symbol,
                        cursor,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "캔들 조회 실패, 재시도"
                    );
                    tokio::time::sleep(delay).await;
                }
                FetchOutcome::Fatal(e) => {
                    error!(symbol, cursor, error = %e, "캔들 조회 불가, 심볼 건너뜀");
                    report.failure = Some(e.to_string());
                    break;
                }
            }
        }

        report.final_cursor = cursor;
        Ok(report)
    }
}

/// 체결 수집 정책.
pub struct TradePolicy {
    source: Arc<dyn MarketDataSource>,
    config: FetchConfig,
}

impl TradePolicy {
    pub fn new(source: Arc<dyn MarketDataSource>, config: FetchConfig) -> Self {
        Self { source, config }
    }
}

#[async_trait]
impl FetchPolicy for TradePolicy {
    type Record = TradeRecord;

    fn name(&self) -> &'static str {
        "trade"
    }

    async fn fetch_symbol(
        &self,
        symbol: &str,
        window: TimeWindow,
        writer: &mut BufferedWriter<TradeRecord>,
    ) -> Result<FetchReport> {
        let mut report = FetchReport::new(symbol, window.start());
        let mut backoff = Backoff::new(self.config.backoff.clone());
        let mut cursor = window.start();
        let mut previous_id: Option<String> = None;
        // 마지막 타임스탬프에서 이미 기록한 체결 ID
        let mut boundary_ts = i64::MIN;
        let mut boundary_ids: HashSet<String> = HashSet::new();

        while cursor < window.end() {
            if report.iterations >= self.config.iteration_cap {
                report.budget_exhausted = true;
                info!(
                    symbol,
                    cursor,
                    end = window.end(),
                    iterations = report.iterations,
                    "반복 상한 도달, 남은 구간 생략"
                );
                break;
            }
            report.iterations += 1;

            let result = self
                .source
                .fetch_trades(symbol, cursor, self.config.page_size)
                .await;

            match FetchOutcome::from(result) {
                FetchOutcome::Page(ticks) => {
                    backoff.reset();

                    let mut trades: Vec<TradeRecord> =
                        ticks.into_iter().map(TradeRecord::from).collect();
                    trades.sort_by_key(|t| t.timestamp);

                    let Some(last) = trades.last() else {
                        continue;
                    };
                    let last_ts = last.timestamp;
                    let last_id = last.trade_id.clone();

                    if previous_id.as_deref() == Some(last_id.as_str()) {
                        cursor += self.config.stall_gap_ms;
                        report.stall_jumps += 1;
                        debug!(symbol, cursor, trade_id = %last_id, "마지막 체결 반복, 커서 전진");
                        continue;
                    }

                    let fresh: Vec<TradeRecord> = trades
                        .into_iter()
                        .filter(|t| {
                            t.timestamp > boundary_ts
                                || (t.timestamp == boundary_ts
                                    && !boundary_ids.contains(&t.trade_id))
                        })
                        .collect();

                    if last_ts > boundary_ts {
                        boundary_ts = last_ts;
                        boundary_ids.clear();
                    }
                    boundary_ids.extend(
                        fresh
                            .iter()
                            .filter(|t| t.timestamp == boundary_ts)
                            .map(|t| t.trade_id.clone()),
                    );

                    report.pages += 1;
                    report.records += fresh.len();
                    writer.write(fresh, true)?;

                    cursor = cursor.max(last_ts);
                    previous_id = Some(last_id);
                }
                FetchOutcome::Empty => {
                    cursor += self.config.stall_gap_ms;
                    report.stall_jumps += 1;
                    debug!(symbol, cursor, "빈 페이지, 커서 전진");
                }
                FetchOutcome::Transient(e) => {
                    report.retries += 1;
                    let delay = backoff.next_delay_for(&e);
                    warn!(
                        symbol,
                        cursor,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "체결 조회 실패, 재시도"
                    );
                    tokio::time::sleep(delay).await;
                }
                FetchOutcome::Fatal(e) => {
                    error!(symbol, cursor, error = %e, "체결 조회 불가");
                    return Err(CollectorError::Exchange(e));
                }
            }
        }

        report.final_cursor = cursor;
        Ok(report)
    }
}
