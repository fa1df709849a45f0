//! Retry controller: attempt outcomes -> entry resolutions
//!
//! Classifies each finished attempt and decides what happens to the entry:
//! retry with exponential backoff, terminal failure, manual hand-off, or a
//! quota reschedule that leaves the attempt budget untouched.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::config::RetryConfig;
use shared::{ApplicationStatus, AttemptFailure, ConfirmationReceipt, FailureClass, QueueEntry};

/// What one automation attempt produced.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(ConfirmationReceipt),
    Failure(AttemptFailure),
    /// Abort honored at a step boundary.
    Aborted,
}

/// The controller's verdict for an entry after one attempt.
///
/// `attempts` carries the updated count; outcomes that do not consume the
/// attempt budget (manual hand-off, quota reschedule, abort) carry none and
/// leave the entry's count as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Succeeded {
        attempts: u32,
        receipt: ConfirmationReceipt,
    },
    Retry {
        attempts: u32,
        next_eligible: DateTime<Utc>,
        error: AttemptFailure,
    },
    Failed {
        attempts: u32,
        error: AttemptFailure,
    },
    ManualAction,
    Rescheduled {
        next_eligible: DateTime<Utc>,
    },
    Aborted,
}

impl Resolution {
    pub fn target_status(&self) -> ApplicationStatus {
        match self {
            Resolution::Succeeded { .. } => ApplicationStatus::Succeeded,
            Resolution::Retry { .. } => ApplicationStatus::Scheduled,
            Resolution::Failed { .. } => ApplicationStatus::Failed,
            Resolution::ManualAction => ApplicationStatus::NeedsManualAction,
            Resolution::Rescheduled { .. } => ApplicationStatus::Scheduled,
            Resolution::Aborted => ApplicationStatus::Cancelled,
        }
    }
}

/// Decides retries, backoff delays, and terminal failures
#[derive(Debug, Clone)]
pub struct RetryController {
    base_delay: Duration,
}

impl RetryController {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            base_delay: Duration::from_std(config.base_delay)
                .unwrap_or_else(|_| Duration::seconds(60)),
        }
    }

    /// Resolve one finished attempt.
    ///
    /// `quota_resets_at` is when the owner's pacing window next permits a
    /// dispatch; it is only consulted for quota failures.
    pub fn resolve(
        &self,
        entry: &QueueEntry,
        outcome: AttemptOutcome,
        now: DateTime<Utc>,
        quota_resets_at: DateTime<Utc>,
    ) -> Resolution {
        match outcome {
            AttemptOutcome::Success(receipt) => Resolution::Succeeded {
                attempts: entry.attempts + 1,
                receipt,
            },
            AttemptOutcome::Aborted => Resolution::Aborted,
            AttemptOutcome::Failure(error) => self.resolve_failure(entry, error, now, quota_resets_at),
        }
    }

    fn resolve_failure(
        &self,
        entry: &QueueEntry,
        error: AttemptFailure,
        now: DateTime<Utc>,
        quota_resets_at: DateTime<Utc>,
    ) -> Resolution {
        let attempts = entry.attempts + 1;

        match error.class() {
            FailureClass::Manual => Resolution::ManualAction,
            FailureClass::Reschedule => Resolution::Rescheduled {
                next_eligible: quota_resets_at.max(now),
            },
            FailureClass::Terminal => Resolution::Failed { attempts, error },
            FailureClass::Retryable => {
                // An internal fault gets one retry; a second in a row is
                // treated as a bug in the pipeline, not the posting.
                let repeated_fault = matches!(error, AttemptFailure::InternalFault(_))
                    && matches!(entry.last_error, Some(AttemptFailure::InternalFault(_)));

                if repeated_fault || attempts >= entry.max_attempts {
                    Resolution::Failed { attempts, error }
                } else {
                    Resolution::Retry {
                        attempts,
                        next_eligible: now + self.backoff_delay(attempts),
                        error,
                    }
                }
            }
        }
    }

    /// Exponential backoff: base doubles per completed attempt, plus a
    /// uniform jitter of up to one base interval to spread retry bursts.
    fn backoff_delay(&self, attempts_made: u32) -> Duration {
        let base_ms = self.base_delay.num_milliseconds().max(1);
        let exponent = attempts_made.saturating_sub(1).min(16);
        let scaled = base_ms.saturating_mul(1_i64 << exponent);
        let jitter = rand::thread_rng().gen_range(0..base_ms);
        Duration::milliseconds(scaled.saturating_add(jitter))
    }
}
