use serde::{Deserialize, Serialize};

use crate::models::PositionSide;

/// Which amount is compared against `min_notional` to decide the order notional
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotionalFloor {
    /// Use `min_notional` when free capital is at or below it
    FreeCapital,
    /// Use `min_notional` when the invested fraction is at or below it
    InvestAmount,
}

/// Risk and sizing parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    pub leverage: u32,
    /// Take-profit distance as a multiple of the stop distance
    pub tpsl_ratio: f64,
    /// Fraction of free capital committed per entry
    pub invest_fraction: f64,
    /// Minimum order notional in quote currency
    pub min_notional: f64,
    /// Tradable unit sizes are floored to, if any
    pub lot_step: Option<f64>,
    pub notional_floor: NotionalFloor,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self::futures()
    }
}

impl RiskConfig {
    pub fn spot() -> Self {
        Self {
            leverage: 1,
            tpsl_ratio: 2.0,
            invest_fraction: 0.25,
            min_notional: 5.2,
            lot_step: None,
            notional_floor: NotionalFloor::InvestAmount,
        }
    }

    pub fn futures() -> Self {
        Self {
            leverage: 75,
            tpsl_ratio: 2.0,
            invest_fraction: 0.25,
            min_notional: 5.5,
            lot_step: Some(1.0),
            notional_floor: NotionalFloor::FreeCapital,
        }
    }
}

/// Stop-loss and take-profit prices fixed at entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtectiveLevels {
    pub stop_loss: f64,
    pub take_profit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitTrigger {
    StopLoss,
    TakeProfit,
}

impl ProtectiveLevels {
    /// Stop one range away from the close, target `ratio` ranges away
    pub fn for_entry(side: PositionSide, close: f64, range: f64, ratio: f64) -> Self {
        match side {
            PositionSide::Long => Self {
                stop_loss: close - range,
                take_profit: close + ratio * range,
            },
            PositionSide::Short => Self {
                stop_loss: close + range,
                take_profit: close - ratio * range,
            },
        }
    }

    /// Stop-loss is checked before take-profit
    pub fn check(&self, side: PositionSide, close: f64) -> Option<ExitTrigger> {
        match side {
            PositionSide::Long => {
                if close <= self.stop_loss {
                    Some(ExitTrigger::StopLoss)
                } else if close >= self.take_profit {
                    Some(ExitTrigger::TakeProfit)
                } else {
                    None
                }
            }
            PositionSide::Short => {
                if close >= self.stop_loss {
                    Some(ExitTrigger::StopLoss)
                } else if close <= self.take_profit {
                    Some(ExitTrigger::TakeProfit)
                } else {
                    None
                }
            }
        }
    }
}
