/// Calculate Simple Moving Average (SMA) of the most recent `period` values
pub fn calculate_sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let sum: f64 = prices.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Smoothing factor for an EMA of the given span
pub fn ema_alpha(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Exponential Moving Average over the whole series, seeded with the first sample
///
/// `ema[0] = prices[0]`, `ema[i] = alpha * prices[i] + (1 - alpha) * ema[i - 1]`
/// with `alpha = 2 / (span + 1)`. Every value depends only on samples up to
/// its own index.
pub fn calculate_ema_series(prices: &[f64], span: usize) -> Vec<f64> {
    ewm_series(prices, ema_alpha(span))
}

/// Recursive exponential smoothing with an explicit alpha, seeded with the first sample
pub fn ewm_series(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;

    for &value in values {
        let next = match prev {
            None => value,
            // A repeated value leaves the average untouched, so flat input stays exactly flat
            Some(p) if p == value => p,
            Some(p) => alpha * value + (1.0 - alpha) * p,
        };
        out.push(next);
        prev = Some(next);
    }

    out
}

/// EMA over a column that starts with a run of missing values
///
/// The recursion is seeded at the first present value, and values are only
/// reported once `min_periods` present samples have been seen.
pub fn calculate_ema_masked(values: &[Option<f64>], span: usize, min_periods: usize) -> Vec<Option<f64>> {
    let alpha = ema_alpha(span);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    let mut seen = 0usize;

    for value in values {
        match value {
            Some(v) => {
                let next = match prev {
                    None => *v,
                    Some(p) if p == *v => p,
                    Some(p) => alpha * v + (1.0 - alpha) * p,
                };
                prev = Some(next);
                seen += 1;
                out.push(if seen >= min_periods { Some(next) } else { None });
            }
            None => out.push(None),
        }
    }

    out
}

/// Latest EMA value of the series
pub fn calculate_ema(prices: &[f64], span: usize) -> Option<f64> {
    calculate_ema_series(prices, span).last().copied()
}
