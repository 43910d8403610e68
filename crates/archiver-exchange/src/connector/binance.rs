//! Binance 거래소 커넥터.
//!
//! Binance Spot 공개 REST API로 심볼 목록, 캔들, 집계 체결을 조회합니다.
//! 서명이 필요한 엔드포인트는 사용하지 않습니다.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error};

use archiver_core::{Kline, Side, Timeframe, TradeTick, ONE_HOUR_MS};

use crate::traits::{ExchangeResult, MarketDataSource};
use crate::ExchangeError;

const DEFAULT_BASE_URL: &str = "https://api.binance.com";

// ============================================================================
// 설정
// ============================================================================

/// Binance 클라이언트 설정.
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    /// REST API 기본 URL
    pub base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl BinanceConfig {
    /// 기본 URL 변경 (미러 또는 테스트 서버).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// 환경 변수(`BINANCE_BASE_URL`, `BINANCE_TIMEOUT_SECS`)에서 생성.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("BINANCE_BASE_URL") {
            config = config.with_base_url(url);
        }
        if let Some(secs) = std::env::var("BINANCE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.timeout_secs = secs;
        }
        config
    }
}

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
struct BinanceExchangeInfo {
    symbols: Vec<BinanceSymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceSymbolInfo {
    status: String,
    base_asset: String,
    quote_asset: String,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct BinanceKline(
    i64,    // 0: Open time
    String, // 1: Open
    String, // 2: High
    String, // 3: Low
    String, // 4: Close
    String, // 5: Volume
    i64,    // 6: Close time
    String, // 7: Quote asset volume
    i64,    // 8: Number of trades
    String, // 9: Taker buy base asset volume
    String, // 10: Taker buy quote asset volume
    String, // 11: Ignore
);

/// 집계 체결 (`/api/v3/aggTrades`).
#[derive(Debug, Deserialize)]
struct BinanceAggTrade {
    #[serde(rename = "a")]
    id: i64,
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "q")]
    qty: String,
    #[serde(rename = "T")]
    time: i64,
    #[serde(rename = "m")]
    is_buyer_maker: bool,
}

#[derive(Debug, Deserialize)]
struct BinanceError {
    code: i32,
    msg: String,
}

// ============================================================================
// Binance 클라이언트
// ============================================================================

/// Binance 공개 시장 데이터 클라이언트.
pub struct BinanceClient {
    config: BinanceConfig,
    client: Client,
}

impl BinanceClient {
    /// 새 Binance 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::NetworkError`를 반환합니다.
    pub fn new(config: BinanceConfig) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ExchangeError::NetworkError(format!("HTTP 클라이언트 생성 실패: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// 파라미터에서 쿼리 문자열 생성.
    fn build_query(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// 공개 API 요청.
    async fn public_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let url = format!("{}{}", self.config.base_url, endpoint);
        let query = Self::build_query(params);

        let full_url = if query.is_empty() {
            url
        } else {
            format!("{}?{}", url, query)
        };

        debug!("GET {}", full_url);

        let response = self.client.get(&full_url).send().await?;
        self.handle_response(response).await
    }

    /// API 응답 처리.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> ExchangeResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::NetworkError(e.to_string()))?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| {
                error!("Failed to parse response: {} - Body: {}", e, body);
                ExchangeError::ParseError(e.to_string())
            });
        }

        // 418: 요청 한도 위반 후 IP 차단
        if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
            return Err(ExchangeError::RateLimited);
        }

        if let Ok(error) = serde_json::from_str::<BinanceError>(&body) {
            return Err(Self::map_error_code(error.code, &error.msg));
        }

        if status.is_server_error() {
            Err(ExchangeError::Disconnected(format!("HTTP {}", status)))
        } else {
            Err(ExchangeError::ApiError {
                code: status.as_u16() as i32,
                message: body,
            })
        }
    }

    /// Binance 에러 코드를 ExchangeError로 매핑.
    fn map_error_code(code: i32, msg: &str) -> ExchangeError {
        match code {
            -1000 => ExchangeError::Unknown(msg.to_string()),
            -1001 => ExchangeError::Disconnected(msg.to_string()),
            -1002 => ExchangeError::Unauthorized(msg.to_string()),
            -1003 => ExchangeError::RateLimited,
            -1007 => ExchangeError::Timeout(msg.to_string()),
            -1121 => ExchangeError::SymbolNotFound(msg.to_string()),
            _ => ExchangeError::ApiError {
                code,
                message: msg.to_string(),
            },
        }
    }

    /// "BTC/USDT" -> "BTCUSDT"
    fn to_market_id(symbol: &str) -> String {
        symbol.replace('/', "")
    }

    /// 문자열에서 Decimal 파싱.
    fn parse_decimal(s: &str) -> ExchangeResult<Decimal> {
        Decimal::from_str(s).map_err(|e| ExchangeError::ParseError(format!("{}: {}", s, e)))
    }
}

#[async_trait]
impl MarketDataSource for BinanceClient {
    fn name(&self) -> &str {
        "binance"
    }

    async fn list_symbols(&self) -> ExchangeResult<BTreeSet<String>> {
        let info: BinanceExchangeInfo = self.public_get("/api/v3/exchangeInfo", &[]).await?;

        // BREAK, 상장폐지 심볼은 데이터가 없다
        let symbols: BTreeSet<String> = info
            .symbols
            .into_iter()
            .filter(|s| s.status == "TRADING")
            .map(|s| format!("{}/{}", s.base_asset, s.quote_asset))
            .collect();

        debug!(count = symbols.len(), "exchangeInfo 조회 완료");
        Ok(symbols)
    }

    async fn fetch_klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: i64,
        limit: u32,
    ) -> ExchangeResult<Vec<Kline>> {
        let resp: Vec<BinanceKline> = self
            .public_get(
                "/api/v3/klines",
                &[
                    ("symbol", Self::to_market_id(symbol)),
                    ("interval", timeframe.as_str().to_string()),
                    ("startTime", since.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        resp.into_iter()
            .map(|k| -> ExchangeResult<Kline> {
                Ok(Kline {
                    symbol: symbol.to_string(),
                    open_time: k.0,
                    open: Self::parse_decimal(&k.1)?,
                    high: Self::parse_decimal(&k.2)?,
                    low: Self::parse_decimal(&k.3)?,
                    close: Self::parse_decimal(&k.4)?,
                    volume: Self::parse_decimal(&k.5)?,
                })
            })
            .collect()
    }

    async fn fetch_trades(
        &self,
        symbol: &str,
        since: i64,
        limit: u32,
    ) -> ExchangeResult<Vec<TradeTick>> {
        // startTime과 endTime 간격은 1시간 미만이어야 한다
        let until = since + ONE_HOUR_MS - 1;
        let resp: Vec<BinanceAggTrade> = self
            .public_get(
                "/api/v3/aggTrades",
                &[
                    ("symbol", Self::to_market_id(symbol)),
                    ("startTime", since.to_string()),
                    ("endTime", until.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        resp.into_iter()
            .map(|t| -> ExchangeResult<TradeTick> {
                Ok(TradeTick {
                    symbol: symbol.to_string(),
                    id: t.id.to_string(),
                    timestamp: t.time,
                    side: if t.is_buyer_maker {
                        Side::Sell
                    } else {
                        Side::Buy
                    },
                    price: Self::parse_decimal(&t.price)?,
                    amount: Self::parse_decimal(&t.qty)?,
                })
            })
            .collect()
    }
}
