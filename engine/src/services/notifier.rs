//! Outcome notification
//!
//! `LogNotifier` reports terminal outcomes through the tracing pipeline.
//! A mail or webhook notifier would implement the same trait; delivery is
//! fire-and-forget either way and never blocks the dispatcher.

use async_trait::async_trait;
use tracing::info;

use crate::traits::Notifier;
use shared::{ApplicationOutcome, JobId, UserId};

/// Notifier that writes outcomes to the log
#[derive(Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_outcome(&self, user_id: UserId, job_id: JobId, outcome: ApplicationOutcome) {
        match outcome {
            ApplicationOutcome::Submitted(receipt) => {
                info!(
                    "✅ user {user_id}: application submitted for {} at {} (job {job_id})",
                    receipt.job_title, receipt.company
                );
            }
            ApplicationOutcome::Failed(error) => {
                info!("❌ user {user_id}: application for job {job_id} failed: {error}");
            }
        }
    }
}
