/// Moving Average Convergence Divergence (MACD)
///
/// MACD = EMA(fast) - EMA(slow) of the close, signal line = EMA(MACD, signal).
/// Both EMAs run over the full history from the first close; the MACD is
/// reported once the slow EMA has `slow` samples, and the signal line once it
/// has `signal` MACD samples.
use super::moving_average::{calculate_ema_masked, calculate_ema_series};

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
}

pub fn calculate_macd_series(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> MacdSeries {
    let ema_fast = calculate_ema_series(closes, fast);
    let ema_slow = calculate_ema_series(closes, slow);
    let warmup = fast.max(slow);

    let macd: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .enumerate()
        .map(|(i, (f, s))| if i + 1 >= warmup { Some(f - s) } else { None })
        .collect();

    let signal_line = calculate_ema_masked(&macd, signal, signal);

    MacdSeries {
        macd,
        signal: signal_line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macd_warmup() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 0.5).collect();
        let series = calculate_macd_series(&closes, 12, 26, 9);

        assert!(series.macd[24].is_none());
        assert!(series.macd[25].is_some());
        assert!(series.signal[32].is_none());
        assert!(series.signal[33].is_some());
    }

    #[test]
    fn test_macd_positive_in_uptrend() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let series = calculate_macd_series(&closes, 12, 26, 9);

        let last = series.macd.last().copied().flatten().unwrap();
        assert!(last > 0.0, "fast EMA leads slow EMA in an uptrend");
    }

    #[test]
    fn test_macd_zero_on_flat_prices() {
        let closes = vec![10.0; 40];
        let series = calculate_macd_series(&closes, 12, 26, 9);

        assert_eq!(series.macd.last().copied().flatten(), Some(0.0));
        assert_eq!(series.signal.last().copied().flatten(), Some(0.0));
    }

    #[test]
    fn test_macd_matches_ema_difference() {
        let closes: Vec<f64> = (0..40).map(|i| 50.0 + ((i * 7) % 11) as f64).collect();
        let series = calculate_macd_series(&closes, 12, 26, 9);
        let fast = calculate_ema_series(&closes, 12);
        let slow = calculate_ema_series(&closes, 26);

        let i = closes.len() - 1;
        assert!((series.macd[i].unwrap() - (fast[i] - slow[i])).abs() < 1e-12);
    }
}
