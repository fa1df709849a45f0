//! Dispatch loop and worker pool
//!
//! Polls the queue for eligible entries, claims them up to the worker
//! budget, and runs each attempt on its own task. Finished attempts come
//! back over a report channel and are resolved through the retry
//! controller; terminal outcomes are pushed to the notifier without
//! blocking the loop. On shutdown the loop stops claiming work and drains
//! the attempts already in flight.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::core::backoff::{AttemptOutcome, Resolution, RetryController};
use crate::core::pacing::PacingPolicy;
use crate::error::EngineResult;
use crate::executor::Executor;
use crate::services::QueueStore;
use crate::traits::{AutomationDriver, Notifier, ProfileStore, QueueRepository};
use shared::{ApplicationOutcome, AttemptFailure, QueueEntry};

/// One finished attempt, reported back to the dispatch loop.
struct AttemptReport {
    entry: QueueEntry,
    outcome: AttemptOutcome,
}

/// Claims eligible entries and drives attempts to resolution
pub struct Dispatcher<P, D, N, R>
where
    P: ProfileStore + 'static,
    D: AutomationDriver + 'static,
    N: Notifier + 'static,
    R: QueueRepository + 'static,
{
    store: Arc<QueueStore<R>>,
    profiles: Arc<P>,
    executor: Arc<Executor<D>>,
    notifier: Arc<N>,
    pacing: Arc<Mutex<PacingPolicy>>,
    retry: RetryController,
    worker_count: usize,
    dispatch_interval: std::time::Duration,
}

impl<P, D, N, R> Dispatcher<P, D, N, R>
where
    P: ProfileStore + 'static,
    D: AutomationDriver + 'static,
    N: Notifier + 'static,
    R: QueueRepository + 'static,
{
    pub fn new(
        store: Arc<QueueStore<R>>,
        profiles: Arc<P>,
        executor: Arc<Executor<D>>,
        notifier: Arc<N>,
        pacing: Arc<Mutex<PacingPolicy>>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            profiles,
            executor,
            notifier,
            pacing,
            retry: RetryController::new(&config.retry),
            worker_count: config.dispatch.worker_count,
            dispatch_interval: config.dispatch.dispatch_interval,
        }
    }

    /// Run until a shutdown signal arrives, then drain in-flight attempts.
    pub async fn run(&self, mut shutdown: mpsc::Receiver<()>) -> EngineResult<()> {
        let mut tick = tokio::time::interval(self.dispatch_interval);
        let (report_tx, mut report_rx) = mpsc::unbounded_channel::<AttemptReport>();
        let mut in_flight = 0usize;

        info!(
            "dispatcher started with {} worker slots, polling every {:?}",
            self.worker_count, self.dispatch_interval
        );

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    in_flight += self.fill_slots(in_flight, &report_tx).await;
                }
                Some(report) = report_rx.recv() => {
                    in_flight = in_flight.saturating_sub(1);
                    self.handle_report(report).await;
                }
                _ = shutdown.recv() => {
                    info!("dispatcher shutting down, {in_flight} attempts still in flight");
                    break;
                }
            }
        }

        // Drain: already-running attempts finish and are resolved so no
        // entry is left in progress for the next start to repair.
        drop(report_tx);
        while in_flight > 0 {
            match report_rx.recv().await {
                Some(report) => {
                    in_flight -= 1;
                    self.handle_report(report).await;
                }
                None => break,
            }
        }
        info!("dispatcher drained");
        Ok(())
    }

    /// Claim eligible entries until the worker budget is spent. Returns the
    /// number of attempts spawned.
    async fn fill_slots(
        &self,
        in_flight: usize,
        report_tx: &mpsc::UnboundedSender<AttemptReport>,
    ) -> usize {
        let mut spawned = 0;

        while in_flight + spawned < self.worker_count {
            let claimed = {
                let pacing = self.pacing.lock().await;
                self.store.dispatch_next(&pacing, Utc::now()).await
            };
            let (entry, cancel) = match claimed {
                Ok(Some(claim)) => claim,
                Ok(None) => break,
                Err(e) => {
                    error!("dispatch claim failed: {e}");
                    break;
                }
            };

            let profile = match self.profiles.get_profile(entry.user_id).await {
                Ok(profile) => profile,
                Err(e) => {
                    // Resolve through the normal failure path so the entry
                    // is not stranded in progress.
                    warn!("no profile for entry {}: {e}", entry.id);
                    let report = AttemptReport {
                        entry,
                        outcome: AttemptOutcome::Failure(AttemptFailure::InternalFault(
                            format!("profile unavailable: {e}"),
                        )),
                    };
                    let _ = report_tx.send(report);
                    spawned += 1;
                    continue;
                }
            };

            info!(
                "dispatching entry {} (user {}, job {}, attempt {}/{})",
                entry.id,
                entry.user_id,
                entry.job_id,
                entry.attempts + 1,
                entry.max_attempts
            );

            let executor = self.executor.clone();
            let tx = report_tx.clone();
            tokio::spawn(async move {
                let outcome = executor.run_attempt(&entry, &profile, &cancel).await;
                let _ = tx.send(AttemptReport { entry, outcome });
            });
            spawned += 1;
        }
        spawned
    }

    /// Resolve a finished attempt and notify on terminal outcomes.
    async fn handle_report(&self, report: AttemptReport) {
        let now = Utc::now();
        let quota_resets_at = {
            let pacing = self.pacing.lock().await;
            pacing.next_permit_at(report.entry.user_id, now)
        };
        let resolution = self
            .retry
            .resolve(&report.entry, report.outcome, now, quota_resets_at);

        let resolved = match self
            .store
            .apply_resolution(report.entry.id, &resolution, now)
            .await
        {
            Ok(entry) => entry,
            Err(e) => {
                error!("failed to resolve entry {}: {e}", report.entry.id);
                return;
            }
        };

        let outcome = match &resolution {
            Resolution::Succeeded { receipt, .. } => {
                info!(
                    "entry {} succeeded after {} attempt(s)",
                    resolved.id, resolved.attempts
                );
                Some(ApplicationOutcome::Submitted(receipt.clone()))
            }
            Resolution::Failed { error, .. } => {
                warn!(
                    "entry {} failed permanently after {} attempt(s): {error}",
                    resolved.id, resolved.attempts
                );
                Some(ApplicationOutcome::Failed(error.clone()))
            }
            Resolution::Retry { next_eligible, error, .. } => {
                info!(
                    "entry {} will retry at {next_eligible} after: {error}",
                    resolved.id
                );
                None
            }
            Resolution::ManualAction => {
                warn!("entry {} needs manual action (captcha)", resolved.id);
                None
            }
            Resolution::Rescheduled { next_eligible } => {
                info!(
                    "entry {} rescheduled to {next_eligible} by the daily quota",
                    resolved.id
                );
                None
            }
            Resolution::Aborted => {
                info!("entry {} aborted on request", resolved.id);
                None
            }
        };

        // Fire-and-forget: notification never blocks resolution.
        if let Some(outcome) = outcome {
            let notifier = self.notifier.clone();
            let user_id = resolved.user_id;
            let job_id = resolved.job_id.clone();
            tokio::spawn(async move {
                notifier.notify_outcome(user_id, job_id, outcome).await;
            });
        }
    }
}
