// Technical indicators module
// Implements EMA, MACD, RSI, Bollinger bands and the channel range measure

pub mod atr;
pub mod bollinger;
pub mod features;
pub mod macd;
pub mod moving_average;
pub mod rsi;

pub use atr::{calculate_channel_atr, calculate_channel_atr_series};
pub use bollinger::{calculate_bollinger_series, BollingerBands};
pub use features::{BollingerConfig, FeatureConfig, FeaturePipeline, FeatureRow};
pub use macd::{calculate_macd_series, MacdSeries};
pub use moving_average::{
    calculate_ema, calculate_ema_masked, calculate_ema_series, calculate_sma, ewm_series,
};
pub use rsi::{calculate_rsi, calculate_rsi_series};
