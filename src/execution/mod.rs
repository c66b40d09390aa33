// Decision cycle: state machine, scheduling and the engine that drives them
pub mod executor;
pub mod position_manager;
pub mod scheduler;

pub use executor::{TickReport, TradingEngine};
pub use position_manager::{
    Action, Decision, MarketTick, Phase, PositionMachine, PositionState, TransitionError,
};
pub use scheduler::{next_boundary, Scheduler};
