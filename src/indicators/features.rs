use serde::{Deserialize, Serialize};

use super::{
    calculate_bollinger_series, calculate_channel_atr_series, calculate_ema_series,
    calculate_macd_series, calculate_rsi_series, BollingerBands,
};
use crate::models::{Candle, CandleSeries};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BollingerConfig {
    pub window: usize,
    pub std_devs: f64,
}

impl Default for BollingerConfig {
    fn default() -> Self {
        Self {
            window: 20,
            std_devs: 2.0,
        }
    }
}

/// Configuration for the feature pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeatureConfig {
    pub ema_spans: Vec<usize>,
    pub rsi_window: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger: Option<BollingerConfig>,
    /// Window of the high/low channel used as the range measure
    pub channel_window: Option<usize>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            ema_spans: vec![7, 21],
            rsi_window: 9,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger: None,
            channel_window: None,
        }
    }
}

impl FeatureConfig {
    /// Spot preset: EMAs, MACD and RSI only
    pub fn spot() -> Self {
        Self {
            ema_spans: vec![9, 18],
            ..Self::default()
        }
    }

    /// Futures preset: adds Bollinger bands and the 14-candle channel range
    pub fn futures() -> Self {
        Self {
            bollinger: Some(BollingerConfig::default()),
            channel_window: Some(14),
            ..Self::default()
        }
    }

    /// Rows consumed before every configured indicator has a value
    pub fn warmup_rows(&self) -> usize {
        let macd = self.macd_fast.max(self.macd_slow) + self.macd_signal - 2;
        let rsi = self.rsi_window.saturating_sub(1);
        let bollinger = self
            .bollinger
            .as_ref()
            .map(|b| b.window.saturating_sub(1))
            .unwrap_or(0);
        let channel = self.channel_window.map(|w| w.saturating_sub(1)).unwrap_or(0);

        macd.max(rsi).max(bollinger).max(channel)
    }
}

/// A candle extended with its derived indicator values
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub candle: Candle,
    /// (span, value) for each configured EMA span
    pub emas: Vec<(usize, f64)>,
    pub macd: f64,
    pub macd_signal: f64,
    pub rsi: f64,
    pub bollinger: Option<BollingerBands>,
    pub atr: Option<f64>,
}

impl FeatureRow {
    pub fn close(&self) -> f64 {
        self.candle.close
    }

    pub fn ema(&self, span: usize) -> Option<f64> {
        self.emas.iter().find(|(s, _)| *s == span).map(|(_, v)| *v)
    }
}

/// Turns a candle window into feature rows
///
/// Rows where any configured indicator lacks history are dropped, never filled.
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    config: FeatureConfig,
}

impl FeaturePipeline {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn compute(&self, series: &CandleSeries) -> Vec<FeatureRow> {
        let candles = series.candles();
        let closes = series.closes();

        let emas: Vec<(usize, Vec<f64>)> = self
            .config
            .ema_spans
            .iter()
            .map(|&span| (span, calculate_ema_series(&closes, span)))
            .collect();

        let macd = calculate_macd_series(
            &closes,
            self.config.macd_fast,
            self.config.macd_slow,
            self.config.macd_signal,
        );
        let rsi = calculate_rsi_series(&closes, self.config.rsi_window);

        let bollinger = self
            .config
            .bollinger
            .as_ref()
            .map(|b| calculate_bollinger_series(&closes, b.window, b.std_devs));
        let atr = self
            .config
            .channel_window
            .map(|w| calculate_channel_atr_series(&series.highs(), &series.lows(), w));

        let rows: Vec<FeatureRow> = candles
            .iter()
            .enumerate()
            .filter_map(|(i, candle)| {
                let bands = match &bollinger {
                    Some(column) => Some((*column.get(i)?)?),
                    None => None,
                };
                let range = match &atr {
                    Some(column) => Some((*column.get(i)?)?),
                    None => None,
                };

                Some(FeatureRow {
                    candle: *candle,
                    emas: emas.iter().map(|(span, col)| (*span, col[i])).collect(),
                    macd: macd.macd[i]?,
                    macd_signal: macd.signal[i]?,
                    rsi: rsi[i]?,
                    bollinger: bands,
                    atr: range,
                })
            })
            .collect();

        tracing::debug!(
            candles = candles.len(),
            rows = rows.len(),
            "Computed feature rows"
        );

        rows
    }
}
