//! CSV 아카이브에 기록되는 행 타입.
//!
//! 각 행 타입은 고정 헤더와 윈도우 필터링에 쓰이는 타임스탬프를 노출합니다.

use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::{Kline, TradeTick};

/// 아카이브 가능한 행.
pub trait ArchiveRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// CSV 헤더 (필드 순서와 동일)
    const HEADERS: &'static [&'static str];

    /// 행의 시각 (epoch ms)
    fn timestamp(&self) -> i64;
}

/// 캔들 행. 기본 키는 `(symbol, timestamp)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KlineRecord {
    pub symbol: String,
    pub timestamp: i64,
    pub open: Decimal,
    pub close: Decimal,
    pub low: Decimal,
    pub high: Decimal,
    pub volume: Decimal,
}

impl ArchiveRecord for KlineRecord {
    const HEADERS: &'static [&'static str] =
        &["symbol", "timestamp", "open", "close", "low", "high", "volume"];

    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

impl From<Kline> for KlineRecord {
    fn from(k: Kline) -> Self {
        Self {
            symbol: k.symbol,
            timestamp: k.open_time,
            open: k.open,
            close: k.close,
            low: k.low,
            high: k.high,
            volume: k.volume,
        }
    }
}

/// 체결 행. 기본 키는 `(symbol, trade_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub trade_id: String,
    pub timestamp: i64,
    /// 체결 방향 첫 글자 ('b' / 's')
    pub side: char,
    pub price: Decimal,
    pub amount: Decimal,
}

impl ArchiveRecord for TradeRecord {
    const HEADERS: &'static [&'static str] =
        &["symbol", "trade_id", "timestamp", "side", "price", "amount"];

    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

impl From<TradeTick> for TradeRecord {
    fn from(t: TradeTick) -> Self {
        let side = t.side.as_str().chars().next().unwrap_or('?');
        Self {
            trade_id: sanitize_trade_id(&t.id),
            symbol: t.symbol,
            timestamp: t.timestamp,
            side,
            price: t.price,
            amount: t.amount,
        }
    }
}

/// 체결 ID에 섞여 들어온 개행 문자를 제거합니다.
pub fn sanitize_trade_id(id: &str) -> String {
    id.chars().filter(|c| *c != '\n' && *c != '\r').collect()
}
