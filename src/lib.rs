pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use adapters::{clock::FixedClock, clock::SystemClock, memory::InMemoryStore};
pub use config::{SchedulerConfig, SessionLedger};
pub use crate::core::{lifecycle::SessionLifecycle, matcher::TutorMatcher, scheduling::SchedulingService};
pub use utils::error::{Result, SchedulingError};
