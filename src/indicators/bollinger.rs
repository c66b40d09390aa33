/// Bollinger Bands: SMA(window) +/- std_devs * rolling standard deviation
///
/// The deviation is the population standard deviation of the window.
use super::moving_average::calculate_sma;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

pub fn calculate_bollinger_series(
    prices: &[f64],
    window: usize,
    std_devs: f64,
) -> Vec<Option<BollingerBands>> {
    (0..prices.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                return None;
            }
            let slice = &prices[i + 1 - window..=i];
            let middle = calculate_sma(slice, window)?;
            let variance =
                slice.iter().map(|p| (p - middle).powi(2)).sum::<f64>() / window as f64;
            let deviation = variance.sqrt();

            Some(BollingerBands {
                upper: middle + std_devs * deviation,
                middle,
                lower: middle - std_devs * deviation,
            })
        })
        .collect()
}
