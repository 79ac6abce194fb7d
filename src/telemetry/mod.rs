pub mod refresh;
pub mod replay;

pub use refresh::{RefreshTelemetry, RefreshTrigger};
pub use replay::ReplayOutcome;
