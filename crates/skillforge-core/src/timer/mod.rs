mod driver;
mod engine;
pub mod schedule;
mod state;

pub use driver::TickDriver;
pub use engine::{Engine, Transition, DEFAULT_SETTLE_DELAY_SECS, DRIFT_TOLERANCE_SECS};
pub use state::{EngineState, PendingContinuation, PendingCredit, TimerStatus};
