// Paper trading account with simulated fills
//
// Orders fill immediately and completely at the price they are given.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{split_symbol, GatewayError};
use crate::models::TradeDirection;

const BALANCE_EPSILON: f64 = 1e-9;

/// How balances react to fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountMode {
    /// Cash account: buys spend quote, sells spend base
    Spot,
    /// Margin account: positions are signed, only margin is locked
    Margin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaperFill {
    pub id: Uuid,
    pub symbol: String,
    pub direction: TradeDirection,
    pub size: f64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
struct MarginPosition {
    /// Signed base quantity, negative for shorts
    quantity: f64,
    entry_price: f64,
}

#[derive(Debug, Default)]
struct AccountState {
    balances: HashMap<String, f64>,
    positions: HashMap<String, MarginPosition>,
    leverage: HashMap<String, u32>,
    fills: Vec<PaperFill>,
}

pub struct PaperAccount {
    mode: AccountMode,
    state: Mutex<AccountState>,
}

impl PaperAccount {
    pub fn new(mode: AccountMode) -> Self {
        Self {
            mode,
            state: Mutex::new(AccountState::default()),
        }
    }

    pub fn with_balance(mut self, asset: &str, amount: f64) -> Self {
        self.state
            .get_mut()
            .balances
            .insert(asset.to_string(), amount);
        self
    }

    pub fn mode(&self) -> AccountMode {
        self.mode
    }

    /// Free balance: total minus margin locked by open positions
    pub async fn free_balance(&self, asset: &str) -> f64 {
        let state = self.state.lock().await;
        let total = state.balances.get(asset).copied().unwrap_or(0.0);
        let locked: f64 = state
            .positions
            .iter()
            .filter(|(symbol, _)| split_symbol(symbol).map(|(_, q)| q == asset).unwrap_or(false))
            .map(|(symbol, p)| {
                let leverage = state.leverage.get(symbol).copied().unwrap_or(1).max(1);
                p.quantity.abs() * p.entry_price / leverage as f64
            })
            .sum();
        total - locked
    }

    /// Base quantity of an open margin position, signed
    pub async fn position(&self, symbol: &str) -> f64 {
        let state = self.state.lock().await;
        state.positions.get(symbol).map(|p| p.quantity).unwrap_or(0.0)
    }

    pub async fn set_leverage(&self, symbol: &str, leverage: u32) {
        let mut state = self.state.lock().await;
        state.leverage.insert(symbol.to_string(), leverage.max(1));
    }

    pub async fn fills(&self) -> Vec<PaperFill> {
        self.state.lock().await.fills.clone()
    }

    /// Fill an order in full at `price`
    pub async fn execute(
        &self,
        symbol: &str,
        direction: TradeDirection,
        size: f64,
        price: f64,
    ) -> Result<f64, GatewayError> {
        if size <= 0.0 || !size.is_finite() {
            return Err(GatewayError::Rejected(format!("invalid order size {}", size)));
        }
        if price <= 0.0 || !price.is_finite() {
            return Err(GatewayError::Rejected(format!("invalid order price {}", price)));
        }

        let (base, quote) = split_symbol(symbol)?;
        let free_quote = self.free_balance(quote).await;
        let mut state = self.state.lock().await;

        match self.mode {
            AccountMode::Spot => Self::settle_spot(&mut state, base, quote, direction, size, price)?,
            AccountMode::Margin => {
                Self::settle_margin(&mut state, symbol, quote, free_quote, direction, size, price)?
            }
        }

        let fill = PaperFill {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            direction,
            size,
            price,
            timestamp: Utc::now(),
        };
        tracing::info!(id = %fill.id, symbol, ?direction, size, price, "Paper order filled");
        state.fills.push(fill);

        Ok(price)
    }

    fn settle_spot(
        state: &mut AccountState,
        base: &str,
        quote: &str,
        direction: TradeDirection,
        size: f64,
        price: f64,
    ) -> Result<(), GatewayError> {
        let notional = size * price;
        let (spend_asset, spend, receive_asset, receive) = match direction {
            TradeDirection::Buy => (quote, notional, base, size),
            TradeDirection::Sell => (base, size, quote, notional),
        };

        let available = state.balances.get(spend_asset).copied().unwrap_or(0.0);
        if available + BALANCE_EPSILON < spend {
            return Err(GatewayError::InsufficientBalance {
                asset: spend_asset.to_string(),
                required: spend,
                available,
            });
        }

        state
            .balances
            .insert(spend_asset.to_string(), (available - spend).max(0.0));
        *state
            .balances
            .entry(receive_asset.to_string())
            .or_insert(0.0) += receive;

        Ok(())
    }

    fn settle_margin(
        state: &mut AccountState,
        symbol: &str,
        quote: &str,
        free_quote: f64,
        direction: TradeDirection,
        size: f64,
        price: f64,
    ) -> Result<(), GatewayError> {
        let leverage = state.leverage.get(symbol).copied().unwrap_or(1).max(1) as f64;
        let signed = match direction {
            TradeDirection::Buy => size,
            TradeDirection::Sell => -size,
        };
        let current = state.positions.get(symbol).copied().unwrap_or_default();

        let reducing = current.quantity != 0.0 && current.quantity.signum() != signed.signum();
        let closed = if reducing {
            signed.abs().min(current.quantity.abs())
        } else {
            0.0
        };
        let opened = signed.abs() - closed;

        if opened > 0.0 {
            let margin = opened * price / leverage;
            if free_quote + BALANCE_EPSILON < margin {
                return Err(GatewayError::InsufficientBalance {
                    asset: quote.to_string(),
                    required: margin,
                    available: free_quote,
                });
            }
        }

        if closed > 0.0 {
            let realized = (price - current.entry_price) * closed * current.quantity.signum();
            *state.balances.entry(quote.to_string()).or_insert(0.0) += realized;
        }

        let quantity = current.quantity + signed;
        let next = if quantity.abs() <= BALANCE_EPSILON {
            None
        } else if closed > 0.0 && opened == 0.0 {
            Some(MarginPosition {
                quantity,
                entry_price: current.entry_price,
            })
        } else if current.quantity == 0.0 || closed > 0.0 {
            // fresh position, or flipped through zero
            Some(MarginPosition {
                quantity,
                entry_price: price,
            })
        } else {
            let total = current.quantity.abs() + opened;
            Some(MarginPosition {
                quantity,
                entry_price: (current.entry_price * current.quantity.abs() + price * opened) / total,
            })
        };

        match next {
            Some(p) => state.positions.insert(symbol.to_string(), p),
            None => state.positions.remove(symbol),
        };

        Ok(())
    }
}
