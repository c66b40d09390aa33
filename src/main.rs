use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use candlebot::config::{BotConfig, ConfigOverrides};
use candlebot::gateway::{split_symbol, AccountMode, BinanceGateway, MarketKind, PaperAccount};
use candlebot::models::Variant;
use candlebot::TradingEngine;
use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about = "MACD candle bot for Binance spot and USD-M futures")]
struct Args {
    /// TOML config file (defaults to candlebot.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Which bot to run
    #[arg(long, value_enum)]
    variant: Option<VariantArg>,

    /// Market symbol, e.g. SOL/USDT
    #[arg(short, long)]
    symbol: Option<String>,

    /// Candle timeframe, e.g. 1m, 1h
    #[arg(short, long)]
    timeframe: Option<String>,

    /// Run a single decision cycle and exit
    #[arg(long)]
    once: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum VariantArg {
    Spot,
    Futures,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Spot => Variant::Spot,
            VariantArg::Futures => Variant::Futures,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let args = Args::parse();
    let overrides = ConfigOverrides {
        variant: args.variant.map(Variant::from),
        symbol: args.symbol.clone(),
        timeframe: args.timeframe.clone(),
    };
    let config = BotConfig::load(args.config.as_deref(), &overrides)
        .context("failed to load configuration")?;

    tracing::info!("📊 Configuration:");
    tracing::info!("  Variant: {:?}", config.variant);
    tracing::info!("  Symbol: {} ({})", config.trading.symbol, config.trading.timeframe);
    tracing::info!("  Leverage: {}x", config.risk.leverage);
    tracing::info!("  Invest fraction: {}", config.risk.invest_fraction);

    let gateway = create_gateway(&config)?;
    let mut engine = TradingEngine::new(gateway, &config);

    engine
        .startup()
        .await
        .context("failed to initialise account")?;

    if args.once {
        let report = engine.run_once().await;
        tracing::info!(
            "Single tick: signal {:?}, traded {}, position {:?}",
            report.signal,
            report.traded(),
            report.state.phase()
        );
        return Ok(());
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("⚠️  Received Ctrl+C, shutting down...");
        }
        _ = engine.run() => {}
    }

    tracing::info!("👋 candlebot stopped");
    Ok(())
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("candlebot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn create_gateway(config: &BotConfig) -> anyhow::Result<Arc<BinanceGateway>> {
    let (base, quote) = split_symbol(&config.trading.symbol)?;

    let (market, mode) = match config.variant {
        Variant::Spot => (MarketKind::Spot, AccountMode::Spot),
        Variant::Futures => (MarketKind::Futures, AccountMode::Margin),
    };
    let account = PaperAccount::new(mode)
        .with_balance(quote, config.gateway.paper_quote_balance)
        .with_balance(base, config.gateway.paper_base_balance);

    let gateway = BinanceGateway::new(
        market,
        config.gateway.base_url.clone(),
        config.gateway.requests_per_minute,
        account,
    )
    .context("failed to build Binance client")?;

    Ok(Arc::new(gateway))
}
