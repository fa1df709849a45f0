//! Application-pipeline engine
//!
//! This library coordinates automated job-application submission: it scores
//! postings against a candidate profile, queues selected jobs, and drives a
//! worker pool that executes browser-style automation attempts with retry,
//! backoff, and anti-detection pacing.

pub mod config;
pub mod core;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::EngineConfig;
pub use core::{MatchEngine, PacingPolicy, QueueState, RetryController};
pub use dispatcher::Dispatcher;
pub use error::{EngineError, EngineResult};
pub use executor::Executor;
pub use traits::{AutomationDriver, JobSource, Notifier, ProfileStore, QueueRepository};
