use chrono::{DateTime, Duration, Utc};

use crate::gateway::{Timeframe, TimeframeUnit};

/// Next decision instant for `timeframe`
///
/// One interval past `now`, truncated to the start of the timeframe unit
/// (second, minute, hour, or day; weekly timeframes truncate to the day).
pub fn next_boundary(now: DateTime<Utc>, timeframe: &Timeframe) -> DateTime<Utc> {
    let interval = i64::try_from(timeframe.seconds())
        .ok()
        .and_then(Duration::try_seconds);
    let Some(target) = interval.and_then(|d| now.checked_add_signed(d)) else {
        tracing::warn!("Timeframe {} is out of range, not waiting", timeframe);
        return now;
    };

    let granularity: i64 = match timeframe.unit() {
        TimeframeUnit::Second => 1,
        TimeframeUnit::Minute => 60,
        TimeframeUnit::Hour => 3_600,
        TimeframeUnit::Day | TimeframeUnit::Week => 86_400,
    };

    let secs = target.timestamp();
    let truncated = secs - secs.rem_euclid(granularity);
    DateTime::<Utc>::from_timestamp(truncated, 0).unwrap_or(target)
}

/// Sleeps the trading loop until the next candle boundary
#[derive(Debug, Clone)]
pub struct Scheduler {
    timeframe: Timeframe,
}

impl Scheduler {
    pub fn new(timeframe: Timeframe) -> Self {
        Self { timeframe }
    }

    pub fn timeframe(&self) -> &Timeframe {
        &self.timeframe
    }

    /// Returns the boundary that was waited for
    pub async fn wait_for_next_boundary(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let boundary = next_boundary(now, &self.timeframe);

        tracing::info!("Next run at {}", boundary.format("%Y-%m-%d %H:%M:%S UTC"));

        match (boundary - now).to_std() {
            Ok(wait) if !wait.is_zero() => tokio::time::sleep(wait).await,
            _ => {}
        }

        boundary
    }
}
