// Trading strategy module
pub mod crossover;
pub mod relative;
pub mod signals;

pub use crossover::CrossoverStrategy;
pub use relative::RelativeStrategy;
pub use signals::{shift_signals, SignalRow};

use crate::indicators::FeatureRow;
use crate::models::Signal;

/// Base trait for signal generators
pub trait SignalGenerator: Send + Sync {
    /// Classify each row as Buy/Sell/Hold from data up to and including that row
    fn classify(&self, rows: &[FeatureRow]) -> Vec<Signal>;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Whether the most recent row is still forming and must not be classified
    fn excludes_forming_candle(&self) -> bool {
        false
    }

    /// Signals to act on, one row late so no row acts on its own data
    fn generate(&self, rows: &[FeatureRow]) -> Vec<SignalRow> {
        let rows = if self.excludes_forming_candle() {
            &rows[..rows.len().saturating_sub(1)]
        } else {
            rows
        };

        let raw = self.classify(rows);
        shift_signals(rows, &raw)
    }

    /// Signal for the most recent usable row, Hold when there is none
    fn latest_signal(&self, rows: &[FeatureRow]) -> Signal {
        self.generate(rows)
            .last()
            .map(|s| s.signal)
            .unwrap_or(Signal::Hold)
    }
}
