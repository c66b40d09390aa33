use super::moving_average::ewm_series;

/// Calculate Relative Strength Index (RSI) for every candle
///
/// Uses Wilder smoothing (`alpha = 1 / period`) of per-candle gains and
/// losses. The first candle has no predecessor and contributes a zero move.
/// A value is reported once `period` moves have been smoothed.
///
/// Values:
/// - RSI > 70: Overbought
/// - RSI < 30: Oversold
///
/// When the smoothed loss is zero the RSI saturates at 100, so the result is
/// always within [0, 100].
pub fn calculate_rsi_series(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || prices.is_empty() {
        return vec![None; prices.len()];
    }

    let mut gains = Vec::with_capacity(prices.len());
    let mut losses = Vec::with_capacity(prices.len());
    gains.push(0.0);
    losses.push(0.0);

    for i in 1..prices.len() {
        let change = prices[i] - prices[i - 1];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let alpha = 1.0 / period as f64;
    let avg_gains = ewm_series(&gains, alpha);
    let avg_losses = ewm_series(&losses, alpha);

    avg_gains
        .iter()
        .zip(avg_losses.iter())
        .enumerate()
        .map(|(i, (&avg_gain, &avg_loss))| {
            if i + 1 < period {
                return None;
            }
            if avg_loss == 0.0 {
                return Some(100.0);
            }
            let rs = avg_gain / avg_loss;
            Some(100.0 - (100.0 / (1.0 + rs)))
        })
        .collect()
}

/// Latest RSI value
pub fn calculate_rsi(prices: &[f64], period: usize) -> Option<f64> {
    calculate_rsi_series(prices, period).last().copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_calculation() {
        let prices = vec![
            44.0, 44.25, 44.5, 43.75, 44.0, 44.5, 45.0, 45.5, 45.25, 45.5,
            46.0, 46.5, 46.25, 46.0, 46.5,
        ];

        let rsi = calculate_rsi(&prices, 14);
        assert!(rsi.is_some());

        let rsi_value = rsi.unwrap();
        assert!(rsi_value > 0.0 && rsi_value < 100.0);
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let prices = vec![100.0, 102.0, 101.0];
        let rsi = calculate_rsi(&prices, 14);
        assert!(rsi.is_none());
    }

    #[test]
    fn test_rsi_warmup_length() {
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + (i as f64).sin()).collect();
        let rsi = calculate_rsi_series(&prices, 9);

        assert!(rsi[..8].iter().all(|v| v.is_none()));
        assert!(rsi[8..].iter().all(|v| v.is_some()));
    }

    #[test]
    fn test_rsi_all_gains() {
        let prices = vec![100.0, 101.0, 102.0, 103.0, 104.0, 105.0];
        let rsi = calculate_rsi(&prices, 5);
        assert_eq!(rsi, Some(100.0)); // All gains = RSI 100
    }

    #[test]
    fn test_rsi_all_losses() {
        let prices = vec![105.0, 104.0, 103.0, 102.0, 101.0, 100.0];
        let rsi = calculate_rsi(&prices, 5);
        assert_eq!(rsi, Some(0.0));
    }

    #[test]
    fn test_rsi_bounded() {
        let prices: Vec<f64> = (0..200)
            .map(|i| 50.0 + 30.0 * ((i as f64) * 0.37).sin() + (i % 7) as f64)
            .collect();

        for value in calculate_rsi_series(&prices, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&value), "RSI out of range: {}", value);
        }
    }
}
