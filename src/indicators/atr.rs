/// Range measure used for stop/target sizing ("ATR")
///
/// This is NOT Wilder's Average True Range. It is the width of the rolling
/// high/low channel:
///
/// `atr[i] = max(high[i-window+1..=i]) - min(low[i-window+1..=i])`
///
/// Stop-loss and take-profit distances are multiples of this value, so it must
/// keep exactly this definition.
pub fn calculate_channel_atr_series(highs: &[f64], lows: &[f64], window: usize) -> Vec<Option<f64>> {
    let len = highs.len().min(lows.len());

    (0..len)
        .map(|i| {
            if window == 0 || i + 1 < window {
                return None;
            }
            let start = i + 1 - window;
            let highest = highs[start..=i].iter().copied().fold(f64::MIN, f64::max);
            let lowest = lows[start..=i].iter().copied().fold(f64::MAX, f64::min);
            Some(highest - lowest)
        })
        .collect()
}

/// Latest channel width
pub fn calculate_channel_atr(highs: &[f64], lows: &[f64], window: usize) -> Option<f64> {
    calculate_channel_atr_series(highs, lows, window)
        .last()
        .copied()
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_width_constant_range() {
        let highs = vec![101.0; 15];
        let lows = vec![99.0; 15];

        assert_eq!(calculate_channel_atr(&highs, &lows, 14), Some(2.0));
    }

    #[test]
    fn test_channel_uses_extremes_not_true_range() {
        // Each candle has a range of 1, but the channel spans the whole drift
        let highs: Vec<f64> = (0..14).map(|i| 101.0 + i as f64).collect();
        let lows: Vec<f64> = (0..14).map(|i| 100.0 + i as f64).collect();

        assert_eq!(calculate_channel_atr(&highs, &lows, 14), Some(114.0 - 100.0));
    }

    #[test]
    fn test_channel_warmup() {
        let highs = vec![2.0; 20];
        let lows = vec![1.0; 20];
        let series = calculate_channel_atr_series(&highs, &lows, 14);

        assert!(series[12].is_none());
        assert_eq!(series[13], Some(1.0));
    }

    #[test]
    fn test_channel_window_rolls() {
        let mut highs = vec![10.0; 14];
        let mut lows = vec![9.0; 14];
        highs[0] = 50.0; // spike leaves the window after 14 more candles
        highs.push(10.0);
        lows.push(9.0);

        let series = calculate_channel_atr_series(&highs, &lows, 14);
        assert_eq!(series[13], Some(41.0));
        assert_eq!(series[14], Some(1.0));
    }
}
