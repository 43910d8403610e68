//! 심볼 전체 순회.
//!
//! 거래소의 현물 심볼을 하나씩 끝까지 수집합니다.
//! 한 심볼이 완전히 끝나야 다음 심볼로 넘어갑니다.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use archiver_core::TimeWindow;
use archiver_exchange::MarketDataSource;

use crate::error::CollectorError;
use crate::modules::fetcher::FetchPolicy;
use crate::storage::BufferedWriter;
use crate::Result;

/// 심볼 순회 결과.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriveReport {
    /// 소스가 반환한 심볼 수
    pub symbols_listed: usize,
    /// 수집을 시도한 심볼 수
    pub symbols_driven: usize,
    /// 파생상품이라 제외된 심볼 수
    pub symbols_skipped: usize,
    /// writer로 넘긴 레코드 수
    pub records: usize,
    /// 전체 재시도 횟수
    pub retries: usize,
    /// 반복 상한에 걸린 심볼
    pub budget_exhausted: Vec<String>,
    /// 치명적 에러로 포기한 심볼
    pub failed_symbols: Vec<String>,
}

/// 현물 심볼 여부. `BTC/USDT:USDT` 같은 계약 심볼은 `:`를 포함합니다.
pub fn is_spot_symbol(symbol: &str) -> bool {
    !symbol.contains(':')
}

/// 심볼 집합 드라이버.
pub struct SymbolSetDriver {
    source: Arc<dyn MarketDataSource>,
    show_progress: bool,
}

impl SymbolSetDriver {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self {
            source,
            show_progress: false,
        }
    }

    /// 진행 바 표시 여부.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// 소스의 모든 현물 심볼을 수집합니다.
    ///
    /// # Errors
    /// 심볼 목록 조회 실패는 `CollectorError::SymbolEnumeration`으로 실행 전체를 중단합니다.
    pub async fn drive<P: FetchPolicy>(
        &self,
        policy: &P,
        window: TimeWindow,
        writer: &mut BufferedWriter<P::Record>,
    ) -> Result<DriveReport> {
        let listed = self
            .source
            .list_symbols()
            .await
            .map_err(CollectorError::SymbolEnumeration)?;

        let (spot, derivatives): (Vec<String>, Vec<String>) =
            listed.into_iter().partition(|s| is_spot_symbol(s));

        info!(
            exchange = self.source.name(),
            policy = policy.name(),
            symbols = spot.len(),
            skipped = derivatives.len(),
            "심볼 목록 조회 완료"
        );

        let mut report = self.drive_symbols(policy, &spot, window, writer).await?;
        report.symbols_listed = spot.len() + derivatives.len();
        report.symbols_skipped = derivatives.len();
        Ok(report)
    }

    /// 주어진 심볼만 수집합니다. 끝나면(에러로 끝나도) writer를 flush합니다.
    pub async fn drive_symbols<P: FetchPolicy>(
        &self,
        policy: &P,
        symbols: &[String],
        window: TimeWindow,
        writer: &mut BufferedWriter<P::Record>,
    ) -> Result<DriveReport> {
        let mut report = DriveReport {
            symbols_listed: symbols.len(),
            ..Default::default()
        };
        let progress = self.progress_bar(symbols.len());

        for (idx, symbol) in symbols.iter().enumerate() {
            progress.set_message(symbol.clone());
            debug!(
                symbol = %symbol,
                progress = format!("{}/{}", idx + 1, symbols.len()),
                "수집 시작"
            );

            let fetched = match policy.fetch_symbol(symbol, window, writer).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    progress.abandon();
                    if let Err(flush_err) = writer.flush() {
                        warn!(error = %flush_err, "에러 종료 전 flush 실패");
                    }
                    return Err(e);
                }
            };

            report.symbols_driven += 1;
            report.records += fetched.records;
            report.retries += fetched.retries;
            if fetched.budget_exhausted {
                report.budget_exhausted.push(symbol.clone());
            }
            if fetched.failure.is_some() {
                report.failed_symbols.push(symbol.clone());
            }

            debug!(
                symbol = %symbol,
                records = fetched.records,
                pages = fetched.pages,
                retries = fetched.retries,
                cursor = fetched.final_cursor,
                "수집 완료"
            );
            progress.inc(1);
        }

        writer.flush()?;
        progress.finish_and_clear();

        info!(
            policy = policy.name(),
            symbols = report.symbols_driven,
            records = report.records,
            retries = report.retries,
            failed = report.failed_symbols.len(),
            "심볼 순회 완료"
        );
        Ok(report)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(200));
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_symbols_are_not_spot() {
        assert!(is_spot_symbol("BTC/USDT"));
        assert!(!is_spot_symbol("BTC/USDT:USDT"));
        assert!(!is_spot_symbol("ETH/USD:ETH-230331"));
    }
}
