//! Durable application queue
//!
//! Wraps the pure `QueueState` in an async mutex and writes every mutation
//! through to the repository, so the on-disk view never lags the in-memory
//! one by more than the entry being written. Also owns the per-attempt
//! cancel tokens that carry advisory aborts to the executor.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::core::backoff::Resolution;
use crate::core::pacing::PacingPolicy;
use crate::core::queue::QueueState;
use crate::error::{EngineError, EngineResult};
use crate::traits::{CancelToken, QueueRepository};
use shared::{EntryId, JobId, ListedEntry, QueueEntry, QueueFilter, QueueStats, UserId};

/// Result of a bulk enqueue: what went in and what was already queued.
#[derive(Debug, Default)]
pub struct BulkEnqueueReport {
    pub queued: Vec<QueueEntry>,
    pub skipped: Vec<JobId>,
}

/// Durable queue store shared by the API surface and the dispatcher
pub struct QueueStore<R: QueueRepository> {
    state: Mutex<QueueState>,
    abort_tokens: Mutex<HashMap<EntryId, CancelToken>>,
    repository: R,
    default_priority: u32,
    top_priority: u32,
    default_max_attempts: u32,
}

impl<R: QueueRepository> QueueStore<R> {
    /// Load persisted entries and repair any left in progress by a previous
    /// process: they re-enter the queue as immediately eligible.
    pub async fn open(repository: R, config: &EngineConfig) -> EngineResult<Self> {
        let entries = repository.load_all().await?;
        let loaded = entries.len();

        let aging = Duration::from_std(config.dispatch.aging_interval)
            .unwrap_or_else(|_| Duration::seconds(600));
        let mut state = QueueState::from_entries(entries, aging, config.dispatch.top_priority);

        let recovered = state.recover_in_flight(Utc::now());
        for entry in &recovered {
            warn!("recovered in-flight entry {} for retry", entry.id);
            repository.persist(entry).await?;
        }
        if loaded > 0 {
            info!(
                "queue loaded: {loaded} entries, {} recovered from interrupted attempts",
                recovered.len()
            );
        }

        Ok(Self {
            state: Mutex::new(state),
            abort_tokens: Mutex::new(HashMap::new()),
            repository,
            default_priority: config.dispatch.default_priority,
            top_priority: config.dispatch.top_priority,
            default_max_attempts: config.retry.max_attempts,
        })
    }

    /// Queue one application. Priority defaults and is clamped to the
    /// supported band; duplicates of an active (user, job) pair are rejected.
    pub async fn enqueue(
        &self,
        user_id: UserId,
        job_id: JobId,
        job_url: impl Into<String>,
        priority: Option<u32>,
    ) -> EngineResult<QueueEntry> {
        self.enqueue_at(user_id, job_id, job_url, priority, None).await
    }

    async fn enqueue_at(
        &self,
        user_id: UserId,
        job_id: JobId,
        job_url: impl Into<String>,
        priority: Option<u32>,
        scheduled_for: Option<DateTime<Utc>>,
    ) -> EngineResult<QueueEntry> {
        let priority = priority
            .unwrap_or(self.default_priority)
            .clamp(1, self.top_priority);

        let now = Utc::now();
        let mut entry = QueueEntry::new(
            user_id,
            job_id,
            job_url,
            priority,
            self.default_max_attempts,
            now,
        );
        if let Some(at) = scheduled_for {
            entry.status = shared::ApplicationStatus::Scheduled;
            entry.scheduled_for = Some(at);
        }

        {
            let mut state = self.state.lock().await;
            state.insert(entry.clone())?;
        }
        self.repository.persist(&entry).await?;
        info!(
            "queued application {} for user {} (job {}, priority {})",
            entry.id, entry.user_id, entry.job_id, entry.priority
        );
        Ok(entry)
    }

    /// Queue a batch, staggering eligibility so the batch does not hit the
    /// target board as one burst. Duplicates are skipped, not fatal.
    pub async fn bulk_enqueue(
        &self,
        user_id: UserId,
        jobs: Vec<(JobId, String)>,
        priority: Option<u32>,
        stagger: std::time::Duration,
    ) -> EngineResult<BulkEnqueueReport> {
        let stagger = Duration::from_std(stagger).unwrap_or_else(|_| Duration::zero());
        let now = Utc::now();
        let mut report = BulkEnqueueReport::default();

        for (index, (job_id, job_url)) in jobs.into_iter().enumerate() {
            let scheduled_for = if index == 0 || stagger.is_zero() {
                None
            } else {
                Some(now + stagger * index as i32)
            };
            match self
                .enqueue_at(user_id, job_id.clone(), job_url, priority, scheduled_for)
                .await
            {
                Ok(entry) => report.queued.push(entry),
                Err(EngineError::DuplicateEntry { .. }) => {
                    warn!("bulk enqueue: job {job_id} already queued for user {user_id}");
                    report.skipped.push(job_id);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Strict cancel: succeeds only while the entry is still waiting.
    pub async fn cancel(&self, id: EntryId) -> EngineResult<QueueEntry> {
        let entry = {
            let mut state = self.state.lock().await;
            state.cancel(id, Utc::now())?
        };
        self.repository.persist(&entry).await?;
        info!("cancelled entry {id}");
        Ok(entry)
    }

    /// Advisory abort of an in-flight attempt, honored at the next step
    /// boundary.
    pub async fn request_abort(&self, id: EntryId) -> EngineResult<QueueEntry> {
        let entry = {
            let mut state = self.state.lock().await;
            state.request_abort(id)?
        };
        if let Some(token) = self.abort_tokens.lock().await.get(&id) {
            token.store(true, Ordering::SeqCst);
        }
        self.repository.persist(&entry).await?;
        info!("abort requested for in-flight entry {id}");
        Ok(entry)
    }

    /// Put a manually-resolved entry (captcha solved) back in the queue.
    pub async fn requeue_manual(&self, id: EntryId) -> EngineResult<QueueEntry> {
        let entry = {
            let mut state = self.state.lock().await;
            state.requeue_manual(id)?
        };
        self.repository.persist(&entry).await?;
        info!("entry {id} re-queued after manual action");
        Ok(entry)
    }

    pub async fn get(&self, id: EntryId) -> EngineResult<QueueEntry> {
        let state = self.state.lock().await;
        state.get(id).cloned().ok_or(EngineError::EntryNotFound(id))
    }

    pub async fn list(&self, user_id: UserId, filter: QueueFilter) -> Vec<ListedEntry> {
        let state = self.state.lock().await;
        state.list(user_id, filter, Utc::now())
    }

    pub async fn stats(&self, user_id: UserId) -> QueueStats {
        let state = self.state.lock().await;
        state.stats(user_id)
    }

    /// Atomically pick and claim the next eligible entry, minting its cancel
    /// token. Returns `None` when nothing is ready.
    pub async fn dispatch_next(
        &self,
        pacing: &PacingPolicy,
        now: DateTime<Utc>,
    ) -> EngineResult<Option<(QueueEntry, CancelToken)>> {
        let entry = {
            let mut state = self.state.lock().await;
            match state.select_eligible(now, |user| pacing.permit(user, now)) {
                Some(id) => state.mark_dispatched(id, now)?,
                None => return Ok(None),
            }
        };

        let token: CancelToken = Arc::new(AtomicBool::new(false));
        self.abort_tokens.lock().await.insert(entry.id, token.clone());
        self.repository.persist(&entry).await?;
        Ok(Some((entry, token)))
    }

    /// Apply the retry controller's verdict and retire the cancel token.
    pub async fn apply_resolution(
        &self,
        id: EntryId,
        resolution: &Resolution,
        now: DateTime<Utc>,
    ) -> EngineResult<QueueEntry> {
        let entry = {
            let mut state = self.state.lock().await;
            state.apply_resolution(id, resolution, now)?
        };
        self.abort_tokens.lock().await.remove(&id);
        self.repository.persist(&entry).await?;
        Ok(entry)
    }

    /// True while any entry is waiting or running.
    pub async fn has_active_entries(&self) -> bool {
        let state = self.state.lock().await;
        state.has_active_entries()
    }
}
