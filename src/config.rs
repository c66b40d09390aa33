// Layered bot configuration
//
// Sources, lowest precedence first: the preset for the selected variant, an
// optional TOML file, `CANDLEBOT__*` environment variables, then explicit
// overrides (command-line flags).

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gateway::{split_symbol, Timeframe, TimeframeUnit};
use crate::indicators::FeatureConfig;
use crate::models::Variant;
use crate::risk::RiskConfig;

pub const DEFAULT_CONFIG_FILE: &str = "candlebot.toml";
const ENV_PREFIX: &str = "CANDLEBOT";
/// Longest accepted candle interval (4 weeks)
pub const MAX_TIMEFRAME_SECS: u64 = 4 * 7 * 86_400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Source(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradingConfig {
    /// `BASE/QUOTE`, e.g. `SOL/USDT`
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Candles fetched per tick
    pub candle_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayConfig {
    /// Overrides the public Binance endpoint
    pub base_url: Option<String>,
    pub requests_per_minute: u32,
    /// Starting quote balance of the paper account
    pub paper_quote_balance: f64,
    pub paper_base_balance: f64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            requests_per_minute: 600,
            paper_quote_balance: 100.0,
            paper_base_balance: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BotConfig {
    pub variant: Variant,
    pub trading: TradingConfig,
    pub features: FeatureConfig,
    pub risk: RiskConfig,
    pub gateway: GatewayConfig,
}

/// Values that take precedence over every other source
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub variant: Option<Variant>,
    pub symbol: Option<String>,
    pub timeframe: Option<String>,
}

impl BotConfig {
    pub fn preset(variant: Variant) -> Self {
        match variant {
            Variant::Spot => Self {
                variant,
                trading: TradingConfig {
                    symbol: "SOL/USDT".to_string(),
                    timeframe: Timeframe::new(1, TimeframeUnit::Hour),
                    candle_limit: 100,
                },
                features: FeatureConfig::spot(),
                risk: RiskConfig::spot(),
                gateway: GatewayConfig::default(),
            },
            Variant::Futures => Self {
                variant,
                trading: TradingConfig {
                    symbol: "XRP/USDT".to_string(),
                    timeframe: Timeframe::new(1, TimeframeUnit::Minute),
                    candle_limit: 100,
                },
                features: FeatureConfig::futures(),
                risk: RiskConfig::futures(),
                gateway: GatewayConfig::default(),
            },
        }
    }

    /// Load from `path` (if it exists), the environment and `overrides`
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        let variant = match overrides.variant {
            Some(v) => v,
            None => {
                let peek = Config::builder()
                    .add_source(File::from(path).required(false))
                    .add_source(environment())
                    .build()?;
                match peek.get::<Variant>("variant") {
                    Ok(v) => v,
                    Err(config::ConfigError::NotFound(_)) => Variant::Futures,
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let mut builder = Config::builder()
            .add_source(Config::try_from(&Self::preset(variant))?)
            .add_source(File::from(path).required(false))
            .add_source(environment())
            .set_override("variant", variant_name(variant))?;

        if let Some(symbol) = &overrides.symbol {
            builder = builder.set_override("trading.symbol", symbol.as_str())?;
        }
        if let Some(timeframe) = &overrides.timeframe {
            builder = builder.set_override("trading.timeframe", timeframe.as_str())?;
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if split_symbol(&self.trading.symbol).is_err() {
            return invalid(format!("symbol {:?} is not BASE/QUOTE", self.trading.symbol));
        }
        if self.trading.timeframe.seconds() == 0 || self.trading.timeframe.seconds() > MAX_TIMEFRAME_SECS {
            return invalid(format!(
                "timeframe {} must be between 1s and 4w",
                self.trading.timeframe
            ));
        }
        // Both variants shift signals by one row; spot also drops the forming candle
        let consumed = match self.variant {
            Variant::Spot => 2,
            Variant::Futures => 1,
        };
        if self.trading.candle_limit <= self.features.warmup_rows() + consumed {
            return invalid(format!(
                "candle_limit {} leaves no signal rows after a warm-up of {}",
                self.trading.candle_limit,
                self.features.warmup_rows()
            ));
        }
        if self.risk.leverage == 0 {
            return invalid("leverage must be positive".to_string());
        }
        if !(self.risk.invest_fraction > 0.0 && self.risk.invest_fraction <= 1.0) {
            return invalid(format!(
                "invest_fraction {} must be in (0, 1]",
                self.risk.invest_fraction
            ));
        }
        if self.risk.tpsl_ratio <= 0.0 {
            return invalid("tpsl_ratio must be positive".to_string());
        }
        if self.risk.min_notional < 0.0 {
            return invalid("min_notional must not be negative".to_string());
        }
        if self.features.ema_spans.is_empty() || self.features.ema_spans.contains(&0) {
            return invalid("ema_spans must be non-empty and all >= 1".to_string());
        }
        if self.features.rsi_window == 0 || self.features.macd_signal == 0 {
            return invalid("rsi_window and macd_signal must be >= 1".to_string());
        }
        if self.features.macd_fast == 0 || self.features.macd_fast >= self.features.macd_slow {
            return invalid(format!(
                "macd_fast ({}) must be >= 1 and below macd_slow ({})",
                self.features.macd_fast, self.features.macd_slow
            ));
        }
        if self.variant == Variant::Futures && self.features.channel_window.is_none() {
            return invalid("futures needs features.channel_window for stop/target levels".to_string());
        }

        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX).separator("__")
}

fn variant_name(variant: Variant) -> &'static str {
    match variant {
        Variant::Spot => "spot",
        Variant::Futures => "futures",
    }
}
