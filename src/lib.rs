// Core modules
pub mod config;
pub mod execution;
pub mod gateway;
pub mod indicators;
pub mod models;
pub mod risk;
pub mod strategy;

// Re-export commonly used types
pub use config::BotConfig;
pub use execution::{TickReport, TradingEngine};
pub use models::*;
pub use strategy::SignalGenerator;
