use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::position_manager::{Decision, MarketTick, PositionMachine, PositionState};
use super::scheduler::Scheduler;
use crate::config::{BotConfig, TradingConfig};
use crate::gateway::{split_symbol, ExchangeGateway, GatewayError};
use crate::indicators::FeaturePipeline;
use crate::models::{OrderKind, Signal, Variant};
use crate::strategy::{CrossoverStrategy, RelativeStrategy, SignalGenerator};

/// What happened during one decision cycle
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Candle the signal belongs to, if there was enough history for one
    pub timestamp: Option<DateTime<Utc>>,
    pub signal: Signal,
    pub decision: Option<Decision>,
    pub fill_price: Option<f64>,
    /// Gateway failure that cut the tick short
    pub error: Option<GatewayError>,
    pub state: PositionState,
}

impl TickReport {
    fn new(state: &PositionState) -> Self {
        Self {
            timestamp: None,
            signal: Signal::Hold,
            decision: None,
            fill_price: None,
            error: None,
            state: state.clone(),
        }
    }

    pub fn traded(&self) -> bool {
        self.fill_price.is_some()
    }
}

/// Runs the fetch → features → signal → decision → order cycle
///
/// Ticks never overlap: every gateway call is awaited before the next one.
pub struct TradingEngine {
    gateway: Arc<dyn ExchangeGateway>,
    pipeline: FeaturePipeline,
    generator: Box<dyn SignalGenerator>,
    machine: PositionMachine,
    trading: TradingConfig,
    leverage: u32,
    state: PositionState,
}

impl TradingEngine {
    /// Wire up the signal generator that belongs to `config.variant`
    pub fn new(gateway: Arc<dyn ExchangeGateway>, config: &BotConfig) -> Self {
        let generator: Box<dyn SignalGenerator> = match config.variant {
            Variant::Spot => Box::new(CrossoverStrategy::new()),
            Variant::Futures => Box::new(RelativeStrategy::new()),
        };

        Self {
            gateway,
            pipeline: FeaturePipeline::new(config.features.clone()),
            generator,
            machine: PositionMachine::new(config.variant, &config.trading.symbol, config.risk.clone()),
            trading: config.trading.clone(),
            leverage: config.risk.leverage,
            state: PositionState::flat(),
        }
    }

    pub fn state(&self) -> &PositionState {
        &self.state
    }

    pub fn variant(&self) -> Variant {
        self.machine.variant()
    }

    /// Log the starting balance and, for futures, set leverage once
    pub async fn startup(&self) -> Result<f64, GatewayError> {
        let (_, quote) = split_symbol(&self.trading.symbol)?;
        let balance = self.gateway.fetch_free_balance(quote).await?;

        tracing::info!(
            "Starting {} bot on {} {} with {} ({:.4} {})",
            match self.variant() {
                Variant::Spot => "spot",
                Variant::Futures => "futures",
            },
            self.trading.symbol,
            self.trading.timeframe,
            self.generator.name(),
            balance,
            quote
        );

        if self.variant() == Variant::Futures {
            self.gateway
                .set_leverage(&self.trading.symbol, self.leverage)
                .await?;
        }

        Ok(balance)
    }

    /// One decision cycle; gateway failures are logged and end the tick early
    pub async fn tick(&mut self) -> TickReport {
        let mut report = TickReport::new(&self.state);

        if let Err(e) = self.run_tick(&mut report).await {
            tracing::warn!("Tick abandoned: {}", e);
            report.error = Some(e);
        }

        report.state = self.state.clone();
        report
    }

    async fn run_tick(&mut self, report: &mut TickReport) -> Result<(), GatewayError> {
        let symbol = self.trading.symbol.clone();
        let (base, quote) = split_symbol(&symbol)?;

        let series = self
            .gateway
            .fetch_candles(&symbol, &self.trading.timeframe, self.trading.candle_limit)
            .await?;

        if let Err(e) = series.check_spacing(self.trading.timeframe.seconds()) {
            tracing::warn!("{} - data quality issue: {}", symbol, e);
        }

        let rows = self.pipeline.compute(&series);
        let Some(latest) = self.generator.generate(&rows).pop() else {
            tracing::info!(
                "{} - not enough history ({} candles, {} feature rows)",
                symbol,
                series.len(),
                rows.len()
            );
            return Ok(());
        };

        let timestamp = latest.row.candle.timestamp;
        report.timestamp = Some(timestamp);
        report.signal = latest.signal;

        tracing::debug!(
            "{} @ {}: close={:.6} macd={:.6} signal={:.6} rsi={:.2} range={:?}",
            symbol,
            timestamp,
            latest.row.close(),
            latest.row.macd,
            latest.row.macd_signal,
            latest.row.rsi,
            latest.row.atr
        );

        if self.state.last_evaluated == Some(timestamp) {
            tracing::debug!("{} - candle {} already evaluated", symbol, timestamp);
            return Ok(());
        }

        let free_capital = self.gateway.fetch_free_balance(quote).await?;
        let spot = self.variant() == Variant::Spot;

        let base_balance = if spot && self.state.in_position() && latest.signal == Signal::Sell {
            Some(self.gateway.fetch_position_asset_balance(base).await?)
        } else {
            None
        };
        let last_price = if spot && !self.state.in_position() && latest.signal == Signal::Buy {
            Some(self.gateway.fetch_last_price(&symbol).await?)
        } else {
            None
        };

        let market = MarketTick {
            timestamp,
            signal: latest.signal,
            close: latest.row.close(),
            range: latest.row.atr,
            free_capital,
            base_balance,
            last_price,
        };

        let decision = self.machine.evaluate(&self.state, &market);
        report.decision = Some(decision.clone());

        let Some(intent) = decision.intent() else {
            tracing::info!("{} - {:?}: {}", symbol, latest.signal, decision.reason);
            self.state.last_evaluated = Some(timestamp);
            return Ok(());
        };

        tracing::info!(
            "{} - {:?} {:.8} ({:?}): {}",
            symbol,
            intent.direction,
            intent.size,
            intent.reason,
            decision.reason
        );

        let limit_price = match intent.kind {
            OrderKind::Market => None,
            OrderKind::Limit { price } => Some(price),
        };

        // Failed orders still consume the candle: no retry on the same data
        self.state.last_evaluated = Some(timestamp);

        let fill_price = self
            .gateway
            .place_order(&symbol, intent.direction, intent.size, limit_price)
            .await?;

        match self.machine.apply_fill(&self.state, &decision, fill_price) {
            Ok(next) => {
                report.fill_price = Some(fill_price);
                tracing::info!(
                    "{} - filled {:?} {:.8} at {:.6}; position {:?}",
                    symbol,
                    intent.direction,
                    intent.size,
                    fill_price,
                    next.phase()
                );
                self.state = next;
            }
            Err(e) => {
                tracing::error!("{} - order {} not applied: {}", symbol, intent.id, e);
            }
        }

        Ok(())
    }

    /// Tick on every candle boundary, forever
    pub async fn run(&mut self) {
        let scheduler = Scheduler::new(self.trading.timeframe);

        loop {
            scheduler.wait_for_next_boundary().await;
            let report = self.tick().await;
            tracing::debug!(?report, "Tick complete");
        }
    }

    /// Single tick without waiting for a boundary
    pub async fn run_once(&mut self) -> TickReport {
        self.tick().await
    }
}
