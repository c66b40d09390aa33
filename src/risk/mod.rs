// Risk management module
pub mod limits;
pub mod sizing;

pub use limits::{ExitTrigger, NotionalFloor, ProtectiveLevels, RiskConfig};
pub use sizing::PositionSizer;
