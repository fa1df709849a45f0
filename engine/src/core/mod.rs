//! Core business logic modules
//!
//! This module contains pure business logic with no I/O dependencies.
//! All functions are deterministic (jitter excepted) and easily testable.

pub mod backoff;
pub mod matching;
pub mod pacing;
pub mod queue;

#[cfg(test)]
mod tests;

pub use backoff::{AttemptOutcome, Resolution, RetryController};
pub use matching::MatchEngine;
pub use pacing::PacingPolicy;
pub use queue::QueueState;
