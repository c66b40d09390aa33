use super::SignalGenerator;
use crate::indicators::FeatureRow;
use crate::models::Signal;

/// MACD relative to its signal line (futures bot)
///
/// Buy while MACD is above the signal line, Sell while below, Hold when equal.
#[derive(Debug, Clone, Default)]
pub struct RelativeStrategy;

impl RelativeStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl SignalGenerator for RelativeStrategy {
    fn classify(&self, rows: &[FeatureRow]) -> Vec<Signal> {
        rows.iter()
            .map(|row| {
                if row.macd > row.macd_signal {
                    Signal::Buy
                } else if row.macd < row.macd_signal {
                    Signal::Sell
                } else {
                    Signal::Hold
                }
            })
            .collect()
    }

    fn name(&self) -> &str {
        "RelativeStrategy"
    }
}
