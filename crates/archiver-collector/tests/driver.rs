//! 심볼 드라이버 통합 테스트.

mod common;

use std::sync::Arc;

use archiver_collector::modules::{KlinePolicy, SymbolSetDriver, TradePolicy};
use archiver_collector::storage::{BufferedWriter, MemorySink};
use archiver_collector::{CollectorError, FetchConfig};
use archiver_core::{KlineRecord, Timeframe, TimeWindow, TradeRecord, ONE_DAY_MS, ONE_HOUR_MS};
use archiver_exchange::ExchangeError;

use common::{bars, trade, MockSource, JAN_1_2023, MINUTE_MS};

fn day_window() -> TimeWindow {
    TimeWindow::new(JAN_1_2023, JAN_1_2023 + ONE_DAY_MS).unwrap()
}

#[tokio::test]
async fn test_contract_symbols_are_not_driven() {
    let source = Arc::new(
        MockSource::new(&["BTC/USDT", "BTC/USDT:USDT"]).with_klines(|symbol, since, limit| {
            Ok(bars(symbol, since, JAN_1_2023 + ONE_HOUR_MS, MINUTE_MS, limit))
        }),
    );
    let policy = KlinePolicy::new(source.clone(), Timeframe::M1, FetchConfig::kline_defaults());
    let sink = MemorySink::<KlineRecord>::new();
    let mut writer = BufferedWriter::new(day_window(), 10_000, Box::new(sink.clone()));

    let report = SymbolSetDriver::new(source.clone())
        .drive(&policy, day_window(), &mut writer)
        .await
        .unwrap();

    let driven: Vec<String> = source.kline_calls().into_iter().map(|(s, _)| s).collect();
    assert!(driven.iter().all(|s| s == "BTC/USDT"));
    assert_eq!(report.symbols_listed, 2);
    assert_eq!(report.symbols_driven, 1);
    assert_eq!(report.symbols_skipped, 1);

    // 드라이버가 마지막에 flush 한다
    assert_eq!(writer.pending(), 0);
    assert_eq!(sink.rows().len(), 60);
    assert!(sink.rows().iter().all(|r| r.symbol == "BTC/USDT"));
}

#[tokio::test]
async fn test_symbol_enumeration_failure_aborts() {
    let source = Arc::new(MockSource::new(&[]).with_list_error(ExchangeError::Unauthorized(
        "bad key".into(),
    )));
    let policy = KlinePolicy::new(source.clone(), Timeframe::M1, FetchConfig::kline_defaults());
    let mut writer = BufferedWriter::new(
        day_window(),
        10_000,
        Box::new(MemorySink::<KlineRecord>::new()),
    );

    let result = SymbolSetDriver::new(source.clone())
        .drive(&policy, day_window(), &mut writer)
        .await;

    assert!(matches!(result, Err(CollectorError::SymbolEnumeration(_))));
    assert_eq!(source.fetch_calls(), 0);
}

#[tokio::test]
async fn test_kline_fatal_symbol_is_reported_and_next_symbol_is_driven() {
    let source = Arc::new(MockSource::new(&["AAA/USDT", "BBB/USDT"]).with_klines(
        |symbol, since, limit| {
            if symbol == "AAA/USDT" {
                return Err(ExchangeError::SymbolNotFound(symbol.to_string()));
            }
            Ok(bars(symbol, since, JAN_1_2023 + 10 * MINUTE_MS, MINUTE_MS, limit))
        },
    ));
    let policy = KlinePolicy::new(source.clone(), Timeframe::M1, FetchConfig::kline_defaults());
    let sink = MemorySink::<KlineRecord>::new();
    let mut writer = BufferedWriter::new(day_window(), 10_000, Box::new(sink.clone()));

    let report = SymbolSetDriver::new(source.clone())
        .drive(&policy, day_window(), &mut writer)
        .await
        .unwrap();

    assert_eq!(report.failed_symbols, vec!["AAA/USDT".to_string()]);
    assert_eq!(report.symbols_driven, 2);
    assert_eq!(sink.rows().len(), 10);
}

#[tokio::test]
async fn test_trade_fatal_flushes_buffer_before_propagating() {
    let source = Arc::new(MockSource::new(&["AAA/USDT", "BBB/USDT"]).with_trades(
        |symbol, since, _| {
            if symbol == "BBB/USDT" {
                return Err(ExchangeError::Unauthorized("banned".into()));
            }
            if since == JAN_1_2023 {
                Ok(vec![
                    trade(symbol, "1", JAN_1_2023 + 1),
                    trade(symbol, "2", JAN_1_2023 + 2),
                ])
            } else {
                Ok(vec![])
            }
        },
    ));
    let policy = TradePolicy::new(source.clone(), FetchConfig::trade_defaults());
    let sink = MemorySink::<TradeRecord>::new();
    let mut writer = BufferedWriter::new(day_window(), 10_000, Box::new(sink.clone()));

    let result = SymbolSetDriver::new(source.clone())
        .drive(&policy, day_window(), &mut writer)
        .await;

    assert!(matches!(result, Err(CollectorError::Exchange(_))));
    assert_eq!(writer.pending(), 0);
    assert_eq!(sink.rows().len(), 2);
}

#[tokio::test]
async fn test_drive_explicit_symbols_skips_enumeration() {
    let source = Arc::new(MockSource::new(&["BTC/USDT", "ETH/USDT"]).with_klines(
        |symbol, since, limit| Ok(bars(symbol, since, JAN_1_2023 + 5 * MINUTE_MS, MINUTE_MS, limit)),
    ));
    let policy = KlinePolicy::new(source.clone(), Timeframe::M1, FetchConfig::kline_defaults());
    let sink = MemorySink::<KlineRecord>::new();
    let mut writer = BufferedWriter::new(day_window(), 10_000, Box::new(sink.clone()));

    let report = SymbolSetDriver::new(source.clone())
        .drive_symbols(&policy, &["ETH/USDT".to_string()], day_window(), &mut writer)
        .await
        .unwrap();

    assert_eq!(source.list_calls(), 0);
    assert_eq!(report.symbols_driven, 1);
    assert_eq!(report.records, 5);
    assert!(sink.rows().iter().all(|r| r.symbol == "ETH/USDT"));
}
