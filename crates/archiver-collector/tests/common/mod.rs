//! 통합 테스트 공용 mock 데이터 소스.

#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use archiver_core::{Kline, Side, Timeframe, TradeTick};
use archiver_exchange::{ExchangeError, ExchangeResult, MarketDataSource};

pub const MINUTE_MS: i64 = 60_000;
/// 2023-01-01T00:00:00Z
pub const JAN_1_2023: i64 = 1_672_531_200_000;

type KlineResponder = Box<dyn Fn(&str, i64, u32) -> ExchangeResult<Vec<Kline>> + Send + Sync>;
type TradeResponder = Box<dyn Fn(&str, i64, u32) -> ExchangeResult<Vec<TradeTick>> + Send + Sync>;

/// 호출을 기록하는 스크립트 소스.
pub struct MockSource {
    symbols: Vec<String>,
    list_error: Option<ExchangeError>,
    klines: KlineResponder,
    trades: TradeResponder,
    list_calls: AtomicUsize,
    kline_calls: Mutex<Vec<(String, i64)>>,
    trade_calls: Mutex<Vec<(String, i64)>>,
}

impl MockSource {
    pub fn new(symbols: &[&str]) -> Self {
        Self {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            list_error: None,
            klines: Box::new(|_, _, _| Ok(vec![])),
            trades: Box::new(|_, _, _| Ok(vec![])),
            list_calls: AtomicUsize::new(0),
            kline_calls: Mutex::new(Vec::new()),
            trade_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_klines<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, i64, u32) -> ExchangeResult<Vec<Kline>> + Send + Sync + 'static,
    {
        self.klines = Box::new(f);
        self
    }

    pub fn with_trades<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, i64, u32) -> ExchangeResult<Vec<TradeTick>> + Send + Sync + 'static,
    {
        self.trades = Box::new(f);
        self
    }

    pub fn with_list_error(mut self, error: ExchangeError) -> Self {
        self.list_error = Some(error);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn kline_calls(&self) -> Vec<(String, i64)> {
        self.kline_calls.lock().unwrap().clone()
    }

    pub fn trade_calls(&self) -> Vec<(String, i64)> {
        self.trade_calls.lock().unwrap().clone()
    }

    pub fn fetch_calls(&self) -> usize {
        self.kline_calls().len() + self.trade_calls().len()
    }
}

#[async_trait]
impl MarketDataSource for MockSource {
    fn name(&self) -> &str {
        "binance"
    }

    async fn list_symbols(&self) -> ExchangeResult<BTreeSet<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        match &self.list_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.symbols.iter().cloned().collect()),
        }
    }

    async fn fetch_klines(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        since: i64,
        limit: u32,
    ) -> ExchangeResult<Vec<Kline>> {
        self.kline_calls
            .lock()
            .unwrap()
            .push((symbol.to_string(), since));
        (self.klines)(symbol, since, limit)
    }

    async fn fetch_trades(
        &self,
        symbol: &str,
        since: i64,
        limit: u32,
    ) -> ExchangeResult<Vec<TradeTick>> {
        self.trade_calls
            .lock()
            .unwrap()
            .push((symbol.to_string(), since));
        (self.trades)(symbol, since, limit)
    }
}

pub fn kline(symbol: &str, open_time: i64) -> Kline {
    Kline {
        symbol: symbol.to_string(),
        open_time,
        open: Decimal::new(16_500, 0),
        high: Decimal::new(16_510, 0),
        low: Decimal::new(16_490, 0),
        close: Decimal::new(16_505, 0),
        volume: Decimal::new(125, 2),
    }
}

/// `[from, to)` 구간의 `step` 간격 캔들 중 앞에서부터 최대 `limit`개.
pub fn bars(symbol: &str, from: i64, to: i64, step: i64, limit: u32) -> Vec<Kline> {
    (0..)
        .map(|i| from + i * step)
        .take_while(|ts| *ts < to)
        .take(limit as usize)
        .map(|ts| kline(symbol, ts))
        .collect()
}

pub fn trade(symbol: &str, id: &str, timestamp: i64) -> TradeTick {
    TradeTick {
        symbol: symbol.to_string(),
        id: id.to_string(),
        timestamp,
        side: Side::Buy,
        price: Decimal::new(16_500, 0),
        amount: Decimal::new(1, 2),
    }
}
