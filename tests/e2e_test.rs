use std::sync::Arc;

use candlebot::config::BotConfig;
use candlebot::execution::{Action, Phase};
use candlebot::gateway::{AccountMode, GatewayError, SimulatedGateway};
use candlebot::models::{
    Candle, CandleSeries, OrderKind, PositionSide, Signal, TradeDirection, TradeReason, Variant,
};
use candlebot::TradingEngine;
use chrono::{DateTime, Duration, Utc};

fn create_test_candles(closes: &[f64], step: Duration) -> CandleSeries {
    let start = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
    let candles = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            timestamp: start + step * i as i32,
            open: close,
            high: close,
            low: close,
            close,
            volume: 100.0,
        })
        .collect();
    CandleSeries::new(candles).unwrap()
}

/// Slide down to 10, rally to 16, hold, then sell off.
/// MACD crosses above zero at index 46 and back below at index 63.
fn spot_closes() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..40).map(|i| 15.0 - 5.0 * i as f64 / 39.0).collect();
    closes.extend((1..13).map(|i| 10.0 + 0.5 * i as f64));
    closes.extend([16.0; 6]);
    closes.extend([15.0, 14.0, 13.0, 12.0, 11.0, 10.0, 9.0, 8.0]);
    closes
}

/// Flat at 10 then 9, 8, 7: MACD drops under its signal line
fn futures_closes() -> Vec<f64> {
    let mut closes = vec![10.0; 60];
    closes.extend([9.0, 8.0, 7.0]);
    closes
}

async fn spot_engine(closes: &[f64]) -> (Arc<SimulatedGateway>, TradingEngine) {
    let _ = tracing_subscriber::fmt::try_init();

    let gateway = Arc::new(SimulatedGateway::new(AccountMode::Spot).with_balance("USDT", 100.0));
    gateway
        .set_candles(create_test_candles(closes, Duration::hours(1)))
        .await;

    let engine = TradingEngine::new(gateway.clone(), &BotConfig::preset(Variant::Spot));
    engine.startup().await.unwrap();
    (gateway, engine)
}

async fn futures_engine(config: &BotConfig, closes: &[f64]) -> (Arc<SimulatedGateway>, TradingEngine) {
    let _ = tracing_subscriber::fmt::try_init();

    let gateway = Arc::new(SimulatedGateway::new(AccountMode::Margin).with_balance("USDT", 100.0));
    gateway
        .set_candles(create_test_candles(closes, Duration::minutes(1)))
        .await;

    let engine = TradingEngine::new(gateway.clone(), config);
    engine.startup().await.unwrap();
    (gateway, engine)
}

#[tokio::test]
async fn test_futures_sell_opens_short_with_channel_levels() {
    let config = BotConfig::preset(Variant::Futures);
    let (gateway, mut engine) = futures_engine(&config, &futures_closes()).await;

    let report = engine.tick().await;

    assert_eq!(report.error, None);
    assert_eq!(report.signal, Signal::Sell);
    let decision = report.decision.as_ref().unwrap();
    let intent = decision.intent().unwrap();
    assert_eq!(intent.reason, TradeReason::EntryShort);
    assert_eq!(intent.direction, TradeDirection::Sell);
    // 100 * 0.25 / 7 * 75 = 267.86, floored to whole units
    assert_eq!(intent.size, 267.0);

    let state = engine.state();
    assert_eq!(state.phase(), Phase::Short);
    assert_eq!(state.entry_price, 7.0);
    // channel range = max(high, 14) - min(low, 14) = 10 - 7
    assert_eq!(state.stop_loss_price, Some(10.0));
    assert_eq!(state.take_profit_price, Some(1.0));

    let fills = gateway.fills().await;
    assert_eq!(fills.len(), 1);
    assert_eq!(gateway.account().position("XRP/USDT").await, -267.0);
}

#[tokio::test]
async fn test_futures_short_exits_on_stop_loss() {
    let mut config = BotConfig::preset(Variant::Futures);
    config.risk.leverage = 5;
    let mut closes = futures_closes();
    let (gateway, mut engine) = futures_engine(&config, &closes).await;

    engine.tick().await;
    assert_eq!(engine.state().phase(), Phase::Short);
    let size = engine.state().size;

    closes.extend([8.5, 10.2]);
    gateway
        .set_candles(create_test_candles(&closes, Duration::minutes(1)))
        .await;
    let report = engine.tick().await;

    let intent = report.decision.as_ref().and_then(|d| d.intent()).unwrap();
    assert_eq!(intent.reason, TradeReason::ExitStopLoss);
    assert_eq!(intent.direction, TradeDirection::Buy);
    assert_eq!(intent.size, size);
    assert_eq!(report.fill_price, Some(10.2));
    assert_eq!(engine.state().phase(), Phase::Flat);
    assert_eq!(gateway.account().position("XRP/USDT").await, 0.0);
}

#[tokio::test]
async fn test_zero_fill_on_entry_stays_flat() {
    let config = BotConfig::preset(Variant::Futures);
    let (gateway, mut engine) = futures_engine(&config, &futures_closes()).await;
    gateway.reject_next_with_zero_fill().await;

    let report = engine.tick().await;

    assert!(report.decision.as_ref().unwrap().intent().is_some());
    assert_eq!(report.fill_price, None);
    assert_eq!(engine.state().phase(), Phase::Flat);
    assert!(gateway.fills().await.is_empty());
}

#[tokio::test]
async fn test_order_failure_leaves_state_unchanged() {
    let config = BotConfig::preset(Variant::Futures);
    let (gateway, mut engine) = futures_engine(&config, &futures_closes()).await;
    gateway
        .fail_next_order(GatewayError::Rejected("venue maintenance".to_string()))
        .await;

    let report = engine.tick().await;

    assert!(matches!(report.error, Some(GatewayError::Rejected(_))));
    assert_eq!(engine.state().phase(), Phase::Flat);

    // Not retried on the same candle
    let again = engine.tick().await;
    assert!(again.decision.is_none());
    assert_eq!(gateway.order_attempts().await, 1);
}

#[tokio::test]
async fn test_balance_failure_abandons_tick_before_deciding() {
    let config = BotConfig::preset(Variant::Futures);
    let (gateway, mut engine) = futures_engine(&config, &futures_closes()).await;
    gateway
        .fail_next_balance(GatewayError::Network("connection reset".to_string()))
        .await;

    let report = engine.tick().await;
    assert!(report.decision.is_none());
    assert!(report.error.is_some());
    assert_eq!(gateway.order_attempts().await, 0);

    // The candle was never evaluated, so the next tick acts on it
    let retry = engine.tick().await;
    assert!(retry.traded());
    assert_eq!(engine.state().side, Some(PositionSide::Short));
}

#[tokio::test]
async fn test_same_candle_is_not_traded_twice() {
    let config = BotConfig::preset(Variant::Futures);
    let (gateway, mut engine) = futures_engine(&config, &futures_closes()).await;

    let first = engine.tick().await;
    let second = engine.tick().await;

    assert!(first.traded());
    assert!(!second.traded());
    assert!(second.decision.is_none());
    assert_eq!(gateway.order_attempts().await, 1);
}

#[tokio::test]
async fn test_spot_crossover_buys_then_sells() {
    let closes = spot_closes();

    // Crossing at index 46 is acted on once candle 48 is forming
    let (gateway, mut engine) = spot_engine(&closes[..49]).await;
    let entry = engine.tick().await;

    assert_eq!(entry.signal, Signal::Buy);
    let decision = entry.decision.as_ref().unwrap();
    let intent = decision.intent().unwrap();
    assert_eq!(intent.reason, TradeReason::EntryLong);
    assert_eq!(intent.kind, OrderKind::Limit { price: 14.5 });
    match &decision.action {
        Action::Open { levels, .. } => assert!(levels.is_none()),
        other => panic!("expected entry, got {:?}", other),
    }
    assert_eq!(engine.state().phase(), Phase::Long);
    assert_eq!(engine.state().entry_price, 14.5);

    let held = gateway.account().free_balance("SOL").await;
    assert!(held > 0.0);

    // Crossing back under zero at index 63
    gateway
        .set_candles(create_test_candles(&closes[..66], Duration::hours(1)))
        .await;
    let exit = engine.tick().await;

    assert_eq!(exit.signal, Signal::Sell);
    let intent = exit.decision.as_ref().and_then(|d| d.intent()).unwrap();
    assert_eq!(intent.reason, TradeReason::ExitSignal);
    assert_eq!(intent.size, held);
    assert_eq!(exit.fill_price, Some(8.0));
    assert_eq!(engine.state().phase(), Phase::Flat);
    assert_eq!(gateway.account().free_balance("SOL").await, 0.0);
}

#[tokio::test]
async fn test_spot_ignores_crossover_on_forming_candle() {
    let closes = spot_closes();

    // Crossing on the last (forming) candle, then on the last closed one
    for end in [47, 48] {
        let (gateway, mut engine) = spot_engine(&closes[..end]).await;
        let report = engine.tick().await;

        assert_eq!(report.signal, Signal::Hold, "window ending at {}", end);
        assert_eq!(engine.state().phase(), Phase::Flat);
        assert_eq!(gateway.order_attempts().await, 0);
    }
}

#[tokio::test]
async fn test_spot_sell_while_flat_is_ignored() {
    let closes = spot_closes();
    let (gateway, mut engine) = spot_engine(&closes[..66]).await;

    let report = engine.tick().await;

    assert_eq!(report.signal, Signal::Sell);
    assert_eq!(report.decision.as_ref().unwrap().action, Action::Skip);
    assert_eq!(gateway.order_attempts().await, 0);
}
