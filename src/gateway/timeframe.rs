use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeframeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl TimeframeUnit {
    fn seconds(self) -> u64 {
        match self {
            TimeframeUnit::Second => 1,
            TimeframeUnit::Minute => 60,
            TimeframeUnit::Hour => 3_600,
            TimeframeUnit::Day => 86_400,
            TimeframeUnit::Week => 604_800,
        }
    }

    fn suffix(self) -> char {
        match self {
            TimeframeUnit::Second => 's',
            TimeframeUnit::Minute => 'm',
            TimeframeUnit::Hour => 'h',
            TimeframeUnit::Day => 'd',
            TimeframeUnit::Week => 'w',
        }
    }
}

/// Candle interval such as `1m`, `15m`, `1h` or `1d`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeframe {
    amount: u32,
    unit: TimeframeUnit,
}

impl Timeframe {
    pub fn new(amount: u32, unit: TimeframeUnit) -> Self {
        Self { amount, unit }
    }

    pub fn unit(&self) -> TimeframeUnit {
        self.unit
    }

    /// Interval length in seconds
    pub fn seconds(&self) -> u64 {
        self.amount as u64 * self.unit.seconds()
    }
}

impl FromStr for Timeframe {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || GatewayError::InvalidTimeframe(s.to_string());

        let suffix = s.chars().last().ok_or_else(invalid)?;
        let unit = match suffix {
            's' => TimeframeUnit::Second,
            'm' => TimeframeUnit::Minute,
            'h' => TimeframeUnit::Hour,
            'd' => TimeframeUnit::Day,
            'w' => TimeframeUnit::Week,
            _ => return Err(invalid()),
        };

        let amount: u32 = s[..s.len() - suffix.len_utf8()]
            .parse()
            .map_err(|_| invalid())?;
        if amount == 0 {
            return Err(invalid());
        }

        Ok(Self { amount, unit })
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

impl<'de> Deserialize<'de> for Timeframe {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for Timeframe {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
