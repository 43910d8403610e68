//! 거래소에서 받아온 원본 시장 데이터.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 체결 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// 매수
    Buy,
    /// 매도
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 거래소가 반환한 캔들 하나.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    /// 통합 심볼 (예: "BTC/USDT")
    pub symbol: String,
    /// 캔들 시작 시각 (epoch ms)
    pub open_time: i64,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량 (기준 자산 단위)
    pub volume: Decimal,
}

/// 거래소가 반환한 체결 하나.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeTick {
    /// 통합 심볼
    pub symbol: String,
    /// 거래소 체결 ID (원문 그대로, 정제 전)
    pub id: String,
    /// 체결 시각 (epoch ms)
    pub timestamp: i64,
    /// 체결 방향
    pub side: Side,
    /// 가격
    pub price: Decimal,
    /// 수량
    pub amount: Decimal,
}
