// Scripted in-memory venue
//
// Serves whatever candle window it was given, fills orders through a
// `PaperAccount` and can be told to fail the next call of a given kind.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{AccountMode, ExchangeGateway, GatewayError, PaperAccount, PaperFill, Timeframe};
use crate::models::{CandleSeries, TradeDirection};

#[derive(Debug, Default)]
struct Script {
    candles: Option<CandleSeries>,
    last_price: Option<f64>,
    fail_candles: Option<GatewayError>,
    fail_balance: Option<GatewayError>,
    fail_order: Option<GatewayError>,
    zero_fill_next: bool,
    leverage_calls: Vec<(String, u32)>,
    order_attempts: usize,
}

pub struct SimulatedGateway {
    account: PaperAccount,
    script: Mutex<Script>,
}

impl SimulatedGateway {
    pub fn new(mode: AccountMode) -> Self {
        Self {
            account: PaperAccount::new(mode),
            script: Mutex::new(Script::default()),
        }
    }

    pub fn with_balance(mut self, asset: &str, amount: f64) -> Self {
        self.account = self.account.with_balance(asset, amount);
        self
    }

    pub fn account(&self) -> &PaperAccount {
        &self.account
    }

    /// Replace the candle window served by `fetch_candles`
    pub async fn set_candles(&self, candles: CandleSeries) {
        self.script.lock().await.candles = Some(candles);
    }

    /// Override the ticker price; defaults to the last candle close
    pub async fn set_last_price(&self, price: f64) {
        self.script.lock().await.last_price = Some(price);
    }

    pub async fn fail_next_candles(&self, error: GatewayError) {
        self.script.lock().await.fail_candles = Some(error);
    }

    pub async fn fail_next_balance(&self, error: GatewayError) {
        self.script.lock().await.fail_balance = Some(error);
    }

    pub async fn fail_next_order(&self, error: GatewayError) {
        self.script.lock().await.fail_order = Some(error);
    }

    /// Next order is acknowledged with a fill price of zero
    pub async fn reject_next_with_zero_fill(&self) {
        self.script.lock().await.zero_fill_next = true;
    }

    pub async fn fills(&self) -> Vec<PaperFill> {
        self.account.fills().await
    }

    /// Orders submitted, including failed ones
    pub async fn order_attempts(&self) -> usize {
        self.script.lock().await.order_attempts
    }

    pub async fn leverage_calls(&self) -> Vec<(String, u32)> {
        self.script.lock().await.leverage_calls.clone()
    }
}

#[async_trait]
impl ExchangeGateway for SimulatedGateway {
    async fn fetch_candles(
        &self,
        _symbol: &str,
        _timeframe: &Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, GatewayError> {
        let mut script = self.script.lock().await;
        if let Some(error) = script.fail_candles.take() {
            return Err(error);
        }

        let series = script
            .candles
            .clone()
            .ok_or_else(|| GatewayError::Network("no candles scripted".to_string()))?;
        let candles = series.candles();
        let start = candles.len().saturating_sub(limit);
        Ok(CandleSeries::new(candles[start..].to_vec())?)
    }

    async fn fetch_last_price(&self, symbol: &str) -> Result<f64, GatewayError> {
        let script = self.script.lock().await;
        script
            .last_price
            .or_else(|| script.candles.as_ref().and_then(|c| c.last()).map(|c| c.close))
            .ok_or_else(|| GatewayError::UnknownAsset(symbol.to_string()))
    }

    async fn fetch_free_balance(&self, quote_asset: &str) -> Result<f64, GatewayError> {
        if let Some(error) = self.script.lock().await.fail_balance.take() {
            return Err(error);
        }
        Ok(self.account.free_balance(quote_asset).await)
    }

    async fn fetch_position_asset_balance(&self, base_asset: &str) -> Result<f64, GatewayError> {
        if let Some(error) = self.script.lock().await.fail_balance.take() {
            return Err(error);
        }
        Ok(self.account.free_balance(base_asset).await)
    }

    async fn place_order(
        &self,
        symbol: &str,
        direction: TradeDirection,
        size: f64,
        price: Option<f64>,
    ) -> Result<f64, GatewayError> {
        {
            let mut script = self.script.lock().await;
            script.order_attempts += 1;
            if let Some(error) = script.fail_order.take() {
                return Err(error);
            }
            if script.zero_fill_next {
                script.zero_fill_next = false;
                return Ok(0.0);
            }
        }

        let fill_price = match price {
            Some(p) => p,
            None => self.fetch_last_price(symbol).await?,
        };
        self.account.execute(symbol, direction, size, fill_price).await
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), GatewayError> {
        self.script
            .lock()
            .await
            .leverage_calls
            .push((symbol.to_string(), leverage));
        self.account.set_leverage(symbol, leverage).await;
        Ok(())
    }
}
