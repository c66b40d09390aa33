// Exchange gateway
//
// Everything the trading loop needs from a venue goes through
// `ExchangeGateway`, so the engine can run against Binance market data or a
// fully simulated venue.

pub mod binance;
pub mod paper;
pub mod simulated;
pub mod timeframe;

pub use binance::{BinanceGateway, MarketKind};
pub use paper::{AccountMode, PaperAccount, PaperFill};
pub use simulated::SimulatedGateway;
pub use timeframe::{Timeframe, TimeframeUnit};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CandleSeries, DataError, TradeDirection};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),
    #[error("exchange API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("order rejected: {0}")]
    Rejected(String),
    #[error("insufficient {asset} balance: need {required:.8}, have {available:.8}")]
    InsufficientBalance {
        asset: String,
        required: f64,
        available: f64,
    },
    #[error("unknown asset or symbol: {0}")]
    UnknownAsset(String),
    #[error("invalid timeframe: {0}")]
    InvalidTimeframe(String),
    #[error("failed to decode exchange response: {0}")]
    Decode(String),
    #[error("invalid candle data: {0}")]
    Data(#[from] DataError),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Network(e.to_string())
    }
}

/// Split `BASE/QUOTE` into its assets
pub fn split_symbol(symbol: &str) -> Result<(&str, &str), GatewayError> {
    symbol
        .split_once('/')
        .filter(|(base, quote)| !base.is_empty() && !quote.is_empty())
        .ok_or_else(|| GatewayError::UnknownAsset(symbol.to_string()))
}

/// Narrow interface to the venue
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Most recent `limit` candles, oldest first; the last one may still be forming
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, GatewayError>;

    async fn fetch_last_price(&self, symbol: &str) -> Result<f64, GatewayError>;

    /// Free (available) balance of the quote asset
    async fn fetch_free_balance(&self, quote_asset: &str) -> Result<f64, GatewayError>;

    /// Free balance of the base asset held
    async fn fetch_position_asset_balance(&self, base_asset: &str) -> Result<f64, GatewayError>;

    /// Market order when `price` is `None`, limit order otherwise. Returns the fill price.
    async fn place_order(
        &self,
        symbol: &str,
        direction: TradeDirection,
        size: f64,
        price: Option<f64>,
    ) -> Result<f64, GatewayError>;

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), GatewayError>;

    fn timeframe_to_seconds(&self, timeframe: &str) -> Result<u64, GatewayError> {
        Ok(timeframe.parse::<Timeframe>()?.seconds())
    }
}
