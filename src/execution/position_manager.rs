use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{PositionSide, Signal, TradeDirection, TradeIntent, TradeReason, Variant};
use crate::risk::{ExitTrigger, PositionSizer, ProtectiveLevels, RiskConfig};

/// Coarse state of the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Flat,
    Long,
    Short,
}

/// The single position the bot may hold
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionState {
    pub side: Option<PositionSide>,
    pub entry_price: f64,
    pub stop_loss_price: Option<f64>,
    pub take_profit_price: Option<f64>,
    pub size: f64,
    /// Candle of the last tick that was evaluated
    pub last_evaluated: Option<DateTime<Utc>>,
}

impl PositionState {
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn in_position(&self) -> bool {
        self.side.is_some()
    }

    pub fn phase(&self) -> Phase {
        match self.side {
            None => Phase::Flat,
            Some(PositionSide::Long) => Phase::Long,
            Some(PositionSide::Short) => Phase::Short,
        }
    }

    fn levels(&self) -> Option<ProtectiveLevels> {
        Some(ProtectiveLevels {
            stop_loss: self.stop_loss_price?,
            take_profit: self.take_profit_price?,
        })
    }

    /// Same position, with `timestamp` recorded as evaluated
    pub fn evaluated_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.last_evaluated = Some(timestamp);
        self
    }
}

/// Everything the machine looks at on one tick
#[derive(Debug, Clone, PartialEq)]
pub struct MarketTick {
    /// Open time of the candle the signal belongs to
    pub timestamp: DateTime<Utc>,
    pub signal: Signal,
    pub close: f64,
    /// Channel range measure; required for futures entries
    pub range: Option<f64>,
    /// Free quote-asset capital
    pub free_capital: f64,
    /// Free base-asset balance, used to size spot exits
    pub base_balance: Option<f64>,
    /// Last traded price, used as the spot limit price
    pub last_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Open {
        intent: TradeIntent,
        side: PositionSide,
        levels: Option<ProtectiveLevels>,
    },
    Close {
        intent: TradeIntent,
    },
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: Action,
    pub reason: String,
}

impl Decision {
    fn skip(reason: impl Into<String>) -> Self {
        Self {
            action: Action::Skip,
            reason: reason.into(),
        }
    }

    pub fn intent(&self) -> Option<&TradeIntent> {
        match &self.action {
            Action::Open { intent, .. } | Action::Close { intent } => Some(intent),
            Action::Skip => None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("already holding a {0:?} position")]
    AlreadyInPosition(PositionSide),
    #[error("no open position to close")]
    NotInPosition,
    #[error("invalid fill price {price}")]
    InvalidFill { price: f64 },
    #[error("short positions are not supported by the spot variant")]
    ShortNotSupported,
}

/// Position/risk state machine
///
/// `evaluate` is a pure function of (state, tick) that yields at most one
/// trade intent. The state only changes through `apply_fill`, once the venue
/// has confirmed a positive fill price.
#[derive(Debug, Clone)]
pub struct PositionMachine {
    variant: Variant,
    symbol: String,
    risk: RiskConfig,
    sizer: PositionSizer,
}

impl PositionMachine {
    pub fn new(variant: Variant, symbol: impl Into<String>, risk: RiskConfig) -> Self {
        Self {
            variant,
            symbol: symbol.into(),
            sizer: PositionSizer::new(risk.clone()),
            risk,
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn evaluate(&self, state: &PositionState, tick: &MarketTick) -> Decision {
        if state.last_evaluated == Some(tick.timestamp) {
            return Decision::skip("Tick already evaluated");
        }

        match self.variant {
            Variant::Futures => self.evaluate_futures(state, tick),
            Variant::Spot => self.evaluate_spot(state, tick),
        }
    }

    fn evaluate_futures(&self, state: &PositionState, tick: &MarketTick) -> Decision {
        let can_enter = !state.in_position() && tick.free_capital > self.risk.min_notional;

        let entry_side = match tick.signal {
            Signal::Buy if can_enter => Some(PositionSide::Long),
            Signal::Sell if can_enter => Some(PositionSide::Short),
            _ => None,
        };

        if let Some(side) = entry_side {
            let Some(range) = tick.range else {
                return Decision::skip("No range measure available for stop/target sizing");
            };

            let size = self.sizer.size(tick.free_capital, tick.close);
            if size <= 0.0 {
                return Decision::skip(format!(
                    "Position size rounds to zero (free capital {:.4})",
                    tick.free_capital
                ));
            }

            let levels = ProtectiveLevels::for_entry(side, tick.close, range, self.risk.tpsl_ratio);
            let (direction, reason) = match side {
                PositionSide::Long => (TradeDirection::Buy, TradeReason::EntryLong),
                PositionSide::Short => (TradeDirection::Sell, TradeReason::EntryShort),
            };

            return Decision {
                action: Action::Open {
                    intent: TradeIntent::market(&self.symbol, direction, size, reason),
                    side,
                    levels: Some(levels),
                },
                reason: format!(
                    "{:?} signal with {:.4} free capital; SL {:.6} TP {:.6}",
                    tick.signal, tick.free_capital, levels.stop_loss, levels.take_profit
                ),
            };
        }

        let (Some(side), Some(levels)) = (state.side, state.levels()) else {
            return match tick.signal {
                Signal::Hold => Decision::skip("Hold signal"),
                _ if state.in_position() => Decision::skip("Open position has no protective levels"),
                _ => Decision::skip(format!(
                    "Free capital {:.4} not above minimum {:.4}",
                    tick.free_capital, self.risk.min_notional
                )),
            };
        };

        match levels.check(side, tick.close) {
            Some(trigger) => {
                let exit_direction = match side {
                    PositionSide::Long => TradeDirection::Sell,
                    PositionSide::Short => TradeDirection::Buy,
                };
                let reason = match trigger {
                    ExitTrigger::StopLoss => TradeReason::ExitStopLoss,
                    ExitTrigger::TakeProfit => TradeReason::ExitTakeProfit,
                };

                Decision {
                    action: Action::Close {
                        intent: TradeIntent::market(&self.symbol, exit_direction, state.size, reason),
                    },
                    reason: format!("{:?} position hit {:?} at {:.6}", side, trigger, tick.close),
                }
            }
            None => Decision::skip(format!(
                "Holding {:?}: close {:.6} inside SL {:.6} / TP {:.6}",
                side, tick.close, levels.stop_loss, levels.take_profit
            )),
        }
    }

    fn evaluate_spot(&self, state: &PositionState, tick: &MarketTick) -> Decision {
        match (tick.signal, state.side) {
            (Signal::Buy, None) => {
                let invest = tick.free_capital * self.risk.invest_fraction;
                if tick.free_capital <= invest || tick.free_capital <= self.risk.min_notional {
                    return Decision::skip(format!(
                        "Free capital {:.4} not above minimum {:.4}",
                        tick.free_capital, self.risk.min_notional
                    ));
                }

                let size = self.sizer.size(tick.free_capital, tick.close);
                if size <= 0.0 {
                    return Decision::skip("Position size rounds to zero");
                }

                let mut intent =
                    TradeIntent::market(&self.symbol, TradeDirection::Buy, size, TradeReason::EntryLong);
                if let Some(price) = tick.last_price {
                    intent = intent.with_limit(price);
                }

                Decision {
                    action: Action::Open {
                        intent,
                        side: PositionSide::Long,
                        levels: None,
                    },
                    reason: format!("Buy signal with {:.4} free capital", tick.free_capital),
                }
            }
            (Signal::Buy, Some(_)) => Decision::skip("Already have open position"),
            (Signal::Sell, Some(PositionSide::Long)) => {
                let amount = tick.base_balance.unwrap_or(0.0);
                if amount <= 0.0 {
                    return Decision::skip("Sell signal but no base asset to sell");
                }

                Decision {
                    action: Action::Close {
                        intent: TradeIntent::market(
                            &self.symbol,
                            TradeDirection::Sell,
                            amount,
                            TradeReason::ExitSignal,
                        ),
                    },
                    reason: format!("Sell signal, selling {:.8} held", amount),
                }
            }
            (Signal::Sell, _) => Decision::skip("No position to sell"),
            (Signal::Hold, _) => Decision::skip("Hold signal"),
        }
    }

    /// State after the venue filled the decision's intent at `fill_price`
    pub fn apply_fill(
        &self,
        state: &PositionState,
        decision: &Decision,
        fill_price: f64,
    ) -> Result<PositionState, TransitionError> {
        if decision.intent().is_some() && (fill_price <= 0.0 || !fill_price.is_finite()) {
            return Err(TransitionError::InvalidFill { price: fill_price });
        }

        match &decision.action {
            Action::Skip => Ok(state.clone()),
            Action::Open {
                intent,
                side,
                levels,
            } => {
                if let Some(current) = state.side {
                    return Err(TransitionError::AlreadyInPosition(current));
                }
                if self.variant == Variant::Spot && *side == PositionSide::Short {
                    return Err(TransitionError::ShortNotSupported);
                }

                Ok(PositionState {
                    side: Some(*side),
                    entry_price: fill_price,
                    stop_loss_price: levels.map(|l| l.stop_loss),
                    take_profit_price: levels.map(|l| l.take_profit),
                    size: intent.size,
                    last_evaluated: state.last_evaluated,
                })
            }
            Action::Close { .. } => {
                if !state.in_position() {
                    return Err(TransitionError::NotInPosition);
                }

                Ok(PositionState {
                    last_evaluated: state.last_evaluated,
                    ..PositionState::flat()
                })
            }
        }
    }
}
