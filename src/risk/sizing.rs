use super::limits::{NotionalFloor, RiskConfig};

/// Computes order sizes from free capital
///
/// Sizes are recomputed for every entry attempt from the balance reported
/// on that tick.
#[derive(Debug, Clone)]
pub struct PositionSizer {
    config: RiskConfig,
}

impl PositionSizer {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Quote amount to commit
    pub fn notional(&self, free_capital: f64) -> f64 {
        let invest = free_capital * self.config.invest_fraction;
        let use_floor = match self.config.notional_floor {
            NotionalFloor::FreeCapital => free_capital <= self.config.min_notional,
            NotionalFloor::InvestAmount => invest <= self.config.min_notional,
        };

        if use_floor {
            self.config.min_notional
        } else {
            invest
        }
    }

    /// Base-asset units for an entry at `price`, leveraged and floored to the lot step
    pub fn size(&self, free_capital: f64, price: f64) -> f64 {
        if price <= 0.0 || !price.is_finite() {
            return 0.0;
        }

        let raw = self.notional(free_capital) / price * self.config.leverage.max(1) as f64;
        self.floor_to_lot(raw)
    }

    pub fn floor_to_lot(&self, size: f64) -> f64 {
        match self.config.lot_step {
            Some(step) if step > 0.0 => (size / step).floor() * step,
            _ => size,
        }
    }
}
