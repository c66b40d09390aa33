use super::SignalGenerator;
use crate::indicators::FeatureRow;
use crate::models::Signal;

/// MACD zero-line crossover (spot bot)
///
/// - Buy: previous MACD <= 0 and current MACD > 0
/// - Sell: previous MACD >= 0 and current MACD < 0
/// - Hold: everything else, including the first row
///
/// The most recent row is treated as still forming and never classified.
#[derive(Debug, Clone, Default)]
pub struct CrossoverStrategy;

impl CrossoverStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl SignalGenerator for CrossoverStrategy {
    fn classify(&self, rows: &[FeatureRow]) -> Vec<Signal> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                if i == 0 {
                    return Signal::Hold;
                }
                let prev = rows[i - 1].macd;
                let curr = row.macd;

                if prev <= 0.0 && curr > 0.0 {
                    Signal::Buy
                } else if prev >= 0.0 && curr < 0.0 {
                    Signal::Sell
                } else {
                    Signal::Hold
                }
            })
            .collect()
    }

    fn excludes_forming_candle(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "CrossoverStrategy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::signals::test_support::feature_row;

    fn rows_with_macd(values: &[f64]) -> Vec<FeatureRow> {
        values
            .iter()
            .enumerate()
            .map(|(i, &m)| feature_row(i as i64, m, 0.0))
            .collect()
    }

    #[test]
    fn test_classify_crossings() {
        let rows = rows_with_macd(&[-1.0, 0.5, 0.7, -0.2, 0.0, 0.0, 0.3]);
        let raw = CrossoverStrategy::new().classify(&rows);

        assert_eq!(
            raw,
            vec![
                Signal::Hold,
                Signal::Buy,
                Signal::Hold,
                Signal::Sell,
                Signal::Hold,
                Signal::Hold,
                Signal::Buy,
            ]
        );
    }

    #[test]
    fn test_buy_crossing_is_acted_on_one_row_later() {
        // Crossing at index 2, forming candle at index 4
        let rows = rows_with_macd(&[-1.0, -0.5, 0.5, 0.6, 0.7]);
        let signals = CrossoverStrategy::new().generate(&rows);

        // forming row dropped (4 rows left), then shift drops one more
        assert_eq!(signals.len(), 3);
        assert_eq!(signals[1].row, rows[2]);
        assert_eq!(signals[1].signal, Signal::Hold);
        assert_eq!(signals[2].row, rows[3]);
        assert_eq!(signals[2].signal, Signal::Buy);
    }

    #[test]
    fn test_crossing_on_forming_candle_is_ignored() {
        let rows = rows_with_macd(&[-1.0, -0.8, -0.6, -0.4, 2.0]);
        let signals = CrossoverStrategy::new().generate(&rows);

        assert!(signals.iter().all(|s| s.signal == Signal::Hold));
        assert_eq!(CrossoverStrategy::new().latest_signal(&rows), Signal::Hold);
    }

    #[test]
    fn test_crossing_on_last_closed_candle_is_not_yet_acted_on() {
        // Crossing on the last closed row (index 3); index 4 is forming
        let rows = rows_with_macd(&[-1.0, -0.8, -0.6, 0.4, 0.6]);
        assert_eq!(CrossoverStrategy::new().latest_signal(&rows), Signal::Hold);
    }
}
