// Binance REST market data with a paper-traded account
//
// Candles and prices come from the public spot or USD-M futures endpoints.
// Orders are filled by a `PaperAccount` at the last traded price.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{split_symbol, ExchangeGateway, GatewayError, PaperAccount, Timeframe};
use crate::models::{Candle, CandleSeries, TradeDirection};

pub const SPOT_API_BASE: &str = "https://api.binance.com";
pub const FUTURES_API_BASE: &str = "https://fapi.binance.com";

type BinanceRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketKind {
    Spot,
    Futures,
}

impl MarketKind {
    fn path_prefix(self) -> &'static str {
        match self {
            MarketKind::Spot => "/api/v3",
            MarketKind::Futures => "/fapi/v1",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            MarketKind::Spot => SPOT_API_BASE,
            MarketKind::Futures => FUTURES_API_BASE,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

pub struct BinanceGateway {
    client: Client,
    base_url: String,
    market: MarketKind,
    rate_limiter: Arc<BinanceRateLimiter>,
    account: PaperAccount,
}

impl BinanceGateway {
    pub fn new(
        market: MarketKind,
        base_url: Option<String>,
        requests_per_minute: u32,
        account: PaperAccount,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let quota = Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or_else(|| market.default_base_url().to_string())
                .trim_end_matches('/')
                .to_string(),
            market,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            account,
        })
    }

    pub fn account(&self) -> &PaperAccount {
        &self.account
    }

    /// `SOL/USDT` -> `SOLUSDT`
    fn venue_symbol(symbol: &str) -> Result<String, GatewayError> {
        let (base, quote) = split_symbol(symbol)?;
        Ok(format!("{}{}", base, quote).to_uppercase())
    }

    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<reqwest::Response, GatewayError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}{}", self.base_url, self.market.path_prefix(), endpoint);
        let response = self.client.get(&url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

fn parse_number(value: &Value) -> Result<f64, GatewayError> {
    match value {
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|e| GatewayError::Decode(format!("bad number {:?}: {}", s, e))),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| GatewayError::Decode(format!("bad number {}", n))),
        other => Err(GatewayError::Decode(format!("expected number, got {}", other))),
    }
}

/// One kline row: `[open_time_ms, open, high, low, close, volume, ...]`
fn parse_kline(row: &[Value]) -> Result<Candle, GatewayError> {
    if row.len() < 6 {
        return Err(GatewayError::Decode(format!(
            "kline has {} fields, expected at least 6",
            row.len()
        )));
    }

    let open_time = row[0]
        .as_i64()
        .ok_or_else(|| GatewayError::Decode("kline open time is not an integer".to_string()))?;
    let timestamp = DateTime::<Utc>::from_timestamp_millis(open_time)
        .ok_or_else(|| GatewayError::Decode(format!("kline open time {} out of range", open_time)))?;

    Ok(Candle {
        timestamp,
        open: parse_number(&row[1])?,
        high: parse_number(&row[2])?,
        low: parse_number(&row[3])?,
        close: parse_number(&row[4])?,
        volume: parse_number(&row[5])?,
    })
}

#[async_trait]
impl ExchangeGateway for BinanceGateway {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, GatewayError> {
        let query = [
            ("symbol", Self::venue_symbol(symbol)?),
            ("interval", timeframe.to_string()),
            ("limit", limit.to_string()),
        ];
        let rows: Vec<Vec<Value>> = self
            .get("/klines", &query)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        let candles = rows
            .iter()
            .map(|row| parse_kline(row))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(symbol, %timeframe, count = candles.len(), "Fetched klines");
        Ok(CandleSeries::new(candles)?)
    }

    async fn fetch_last_price(&self, symbol: &str) -> Result<f64, GatewayError> {
        let ticker: TickerPrice = self
            .get("/ticker/price", &[("symbol", Self::venue_symbol(symbol)?)])
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        ticker
            .price
            .parse()
            .map_err(|e| GatewayError::Decode(format!("bad ticker price {:?}: {}", ticker.price, e)))
    }

    async fn fetch_free_balance(&self, quote_asset: &str) -> Result<f64, GatewayError> {
        Ok(self.account.free_balance(quote_asset).await)
    }

    async fn fetch_position_asset_balance(&self, base_asset: &str) -> Result<f64, GatewayError> {
        Ok(self.account.free_balance(base_asset).await)
    }

    async fn place_order(
        &self,
        symbol: &str,
        direction: TradeDirection,
        size: f64,
        price: Option<f64>,
    ) -> Result<f64, GatewayError> {
        let fill_price = match price {
            Some(p) => p,
            None => self.fetch_last_price(symbol).await?,
        };
        self.account.execute(symbol, direction, size, fill_price).await
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), GatewayError> {
        if self.market == MarketKind::Spot {
            return Err(GatewayError::Rejected(
                "leverage is only available on futures markets".to_string(),
            ));
        }
        self.account.set_leverage(symbol, leverage).await;
        tracing::info!(symbol, leverage, "Leverage set");
        Ok(())
    }
}
