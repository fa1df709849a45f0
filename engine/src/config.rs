//! Engine configuration
//!
//! Plain structs with defaults tuned for the demo binary; everything that
//! is policy rather than mechanism (weights, delays, caps) lives here
//! instead of constants scattered through the components.

use crate::error::{EngineError, EngineResult};
use std::time::Duration;

/// Component weights for the match scorer. Must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchWeights {
    pub skills: f64,
    pub experience: f64,
    pub location: f64,
    pub salary: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            skills: 0.5,
            experience: 0.3,
            location: 0.1,
            salary: 0.1,
        }
    }
}

impl MatchWeights {
    pub fn validate(&self) -> EngineResult<()> {
        let components = [self.skills, self.experience, self.location, self.salary];
        if components.iter().any(|w| *w < 0.0) {
            return Err(EngineError::config("match weights must be non-negative"));
        }
        let sum: f64 = components.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(EngineError::config(format!(
                "match weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// Retry and backoff policy settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Default attempt budget for new entries.
    pub max_attempts: u32,
    /// Base delay for exponential backoff; jitter is drawn from [0, base).
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(60),
        }
    }
}

/// Anti-detection pacing settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingConfig {
    /// Minimum delay between automation actions for one user.
    pub min_action_interval: Duration,
    /// Rolling 24h submission cap per user.
    pub daily_limit: u32,
    /// Rotate automation identity after this many submissions.
    pub rotation_cadence: u32,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_action_interval: Duration::from_secs(30),
            daily_limit: 10,
            rotation_cadence: 5,
        }
    }
}

/// Dispatcher loop and worker pool settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchConfig {
    pub worker_count: usize,
    /// How often the loop looks for eligible entries.
    pub dispatch_interval: Duration,
    /// Aging: one priority point per interval waited, capped at `top_priority`.
    pub aging_interval: Duration,
    pub top_priority: u32,
    /// Priority assigned when an enqueue request does not set one.
    pub default_priority: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            dispatch_interval: Duration::from_millis(250),
            aging_interval: Duration::from_secs(600),
            top_priority: 5,
            default_priority: 3,
        }
    }
}

/// Automation executor settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutorConfig {
    /// Timeout applied to every individual automation step.
    pub step_timeout: Duration,
    /// Human-like jitter added on top of the pacing wait before each site
    /// action, drawn uniformly.
    pub min_step_pause: Duration,
    pub max_step_pause: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_secs(30),
            min_step_pause: Duration::from_millis(300),
            max_step_pause: Duration::from_millis(900),
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineConfig {
    pub weights: MatchWeights,
    pub retry: RetryConfig,
    pub pacing: PacingConfig,
    pub dispatch: DispatchConfig,
    pub executor: ExecutorConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        self.weights.validate()?;
        if self.retry.max_attempts == 0 {
            return Err(EngineError::config("retry.max_attempts must be at least 1"));
        }
        if self.dispatch.worker_count == 0 {
            return Err(EngineError::config("dispatch.worker_count must be at least 1"));
        }
        if self.pacing.daily_limit == 0 {
            return Err(EngineError::config("pacing.daily_limit must be at least 1"));
        }
        Ok(())
    }
}
