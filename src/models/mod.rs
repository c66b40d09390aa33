use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// OHLCV candlestick data
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DataError {
    #[error("candle series is empty")]
    Empty,
    #[error("candles out of order at index {index}")]
    Unordered { index: usize },
    #[error("duplicate candle timestamp {timestamp}")]
    DuplicateTimestamp { timestamp: DateTime<Utc> },
    #[error("{gap_secs}s between candles at {from} and {to} (interval {interval_secs}s)")]
    Gap {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        gap_secs: i64,
        interval_secs: u64,
    },
}

/// Candles sorted ascending by timestamp, no duplicates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Result<Self, DataError> {
        if candles.is_empty() {
            return Err(DataError::Empty);
        }

        for (i, pair) in candles.windows(2).enumerate() {
            if pair[1].timestamp == pair[0].timestamp {
                return Err(DataError::DuplicateTimestamp {
                    timestamp: pair[1].timestamp,
                });
            }
            if pair[1].timestamp < pair[0].timestamp {
                return Err(DataError::Unordered { index: i + 1 });
            }
        }

        Ok(Self { candles })
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low).collect()
    }

    /// First spacing wider than 1.5x `interval_secs`, if any
    pub fn check_spacing(&self, interval_secs: u64) -> Result<(), DataError> {
        let max_gap = interval_secs.saturating_add(interval_secs / 2);

        for pair in self.candles.windows(2) {
            let gap_secs = (pair[1].timestamp - pair[0].timestamp).num_seconds();
            if gap_secs as u64 > max_gap {
                return Err(DataError::Gap {
                    from: pair[0].timestamp,
                    to: pair[1].timestamp,
                    gap_secs,
                    interval_secs,
                });
            }
        }

        Ok(())
    }

    /// Drop the most recent (still forming) candle
    pub fn without_last(&self) -> Self {
        let keep = self.candles.len().saturating_sub(1);
        Self {
            candles: self.candles[..keep].to_vec(),
        }
    }
}

/// Trading signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

/// Which of the two bots is running
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Long-only cash trading on MACD zero-line crossovers
    Spot,
    /// Leveraged long/short trading with stop-loss and take-profit
    Futures,
}

/// Side of an open position
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PositionSide {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TradeDirection {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TradeReason {
    EntryLong,
    EntryShort,
    ExitStopLoss,
    ExitTakeProfit,
    ExitSignal,
}

/// How the intent should be routed to the venue
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum OrderKind {
    Market,
    Limit { price: f64 },
}

/// Order request emitted by the position state machine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeIntent {
    pub id: Uuid,
    pub symbol: String,
    pub direction: TradeDirection,
    pub size: f64,
    pub reason: TradeReason,
    pub kind: OrderKind,
}

impl TradeIntent {
    pub fn market(symbol: &str, direction: TradeDirection, size: f64, reason: TradeReason) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            direction,
            size,
            reason,
            kind: OrderKind::Market,
        }
    }

    pub fn with_limit(mut self, price: f64) -> Self {
        self.kind = OrderKind::Limit { price };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn candle_at(minutes: i64, close: f64) -> Candle {
        Candle {
            timestamp: DateTime::<Utc>::UNIX_EPOCH + Duration::minutes(minutes),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_series_accepts_ascending_candles() {
        let series = CandleSeries::new(vec![candle_at(0, 1.0), candle_at(1, 2.0)]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_series_rejects_duplicates() {
        let result = CandleSeries::new(vec![candle_at(0, 1.0), candle_at(0, 2.0)]);
        assert!(matches!(result, Err(DataError::DuplicateTimestamp { .. })));
    }

    #[test]
    fn test_series_rejects_unordered() {
        let result = CandleSeries::new(vec![candle_at(5, 1.0), candle_at(1, 2.0)]);
        assert_eq!(result, Err(DataError::Unordered { index: 1 }));
    }

    #[test]
    fn test_spacing_within_tolerance() {
        let series = CandleSeries::new(vec![
            candle_at(0, 1.0),
            candle_at(5, 1.0),
            candle_at(12, 1.0),
        ])
        .unwrap();

        // 7 minutes is within 1.5 x 5
        assert!(series.check_spacing(300).is_ok());
    }

    #[test]
    fn test_spacing_reports_first_gap() {
        let series = CandleSeries::new(vec![
            candle_at(0, 1.0),
            candle_at(5, 1.0),
            candle_at(60, 1.0),
            candle_at(65, 1.0),
        ])
        .unwrap();

        match series.check_spacing(300) {
            Err(DataError::Gap { from, gap_secs, .. }) => {
                assert_eq!(from, candle_at(5, 1.0).timestamp);
                assert_eq!(gap_secs, 3300);
            }
            other => panic!("expected gap, got {:?}", other),
        }
    }

    #[test]
    fn test_without_last_drops_forming_candle() {
        let series = CandleSeries::new(vec![
            candle_at(0, 1.0),
            candle_at(1, 2.0),
            candle_at(2, 3.0),
        ])
        .unwrap();

        let closed = series.without_last();
        assert_eq!(closed.len(), 2);
        assert_eq!(closed.last().unwrap().close, 2.0);
    }

    #[test]
    fn test_intent_builder() {
        let intent = TradeIntent::market("SOL/USDT", TradeDirection::Buy, 2.0, TradeReason::EntryLong)
            .with_limit(100.0);

        assert_eq!(intent.kind, OrderKind::Limit { price: 100.0 });
        assert_eq!(intent.symbol, "SOL/USDT");
        assert_eq!(intent.size, 2.0);
    }
}
