//! # Skillforge Core Library
//!
//! This library provides the core logic for the Skillforge practice tracker:
//! users log focused work toward long-term skill goals through a timed
//! work/recovery cycle. Every operation is available through the standalone
//! CLI binary built on top of this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine that requires the caller
//!   to periodically invoke `tick()`; survives restarts by persisting its state
//!   and reconciling elapsed time on restore
//! - **Aggregation**: Credits finished sessions to skills, tasks and daily
//!   activity in one transaction, then evaluates achievements
//! - **Storage**: SQLite-based session storage and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`Engine`]: Core timer state machine
//! - [`TickDriver`]: Async one-second pulse for a running engine
//! - [`Database`]: Sessions, skills, tasks, aggregates and achievements
//! - [`Config`]: Application configuration management

pub mod achievements;
pub mod aggregation;
pub mod clock;
pub mod error;
pub mod events;
pub mod model;
pub mod notify;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod timer;

pub use achievements::{Achievement, AchievementEvaluator, AchievementId, CatalogueEvaluator};
pub use aggregation::{CreditReceipt, CreditStatus};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, SettingsError, TransitionError};
pub use events::Event;
pub use model::{
    DailyActivity, Outcome, Reflection, Session, SessionKind, SessionTarget, Skill, Task,
};
pub use notify::{ChannelSink, NotificationSink, NullSink, TracingSink};
pub use settings::SettingsProvider;
pub use stats::Stats;
pub use storage::{Config, ConfigFile, Database, SessionStore};
pub use timer::{Engine, EngineState, TickDriver, TimerStatus, Transition};
