//! Queue entry table and lifecycle state machine
//!
//! Pure state: every method takes `now` explicitly and performs no I/O.
//! The service layer wraps this in a mutex, which serializes all status
//! writes and makes the dispatch transition an atomic check-and-set.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};

use crate::core::backoff::Resolution;
use crate::error::{EngineError, EngineResult};
use shared::{
    ApplicationStatus, AttemptFailure, EntryId, JobId, ListedEntry, QueueEntry, QueueFilter,
    QueueStats, UserId,
};

/// Valid edges of the entry state machine.
///
/// Forward-only except the retry edge (InProgress -> Scheduled) and the
/// external re-enqueue edge (NeedsManualAction -> Pending). Terminal
/// statuses have no outgoing edges.
pub fn valid_transition(from: ApplicationStatus, to: ApplicationStatus) -> bool {
    use ApplicationStatus::*;
    matches!(
        (from, to),
        (Pending, Scheduled)
            | (Pending, InProgress)
            | (Pending, Cancelled)
            | (Scheduled, InProgress)
            | (Scheduled, Cancelled)
            | (InProgress, Succeeded)
            | (InProgress, Failed)
            | (InProgress, Scheduled)
            | (InProgress, NeedsManualAction)
            | (InProgress, Cancelled)
            | (NeedsManualAction, Pending)
    )
}

/// In-memory entry table with eligibility selection
pub struct QueueState {
    entries: HashMap<EntryId, QueueEntry>,
    /// Aging: one effective-priority point per interval waited.
    aging_interval: Duration,
    /// Aging never promotes an entry beyond this tier.
    top_priority: u32,
}

impl QueueState {
    pub fn new(aging_interval: Duration, top_priority: u32) -> Self {
        Self {
            entries: HashMap::new(),
            aging_interval,
            top_priority,
        }
    }

    /// Rebuild state from persisted entries (process restart).
    pub fn from_entries(
        entries: Vec<QueueEntry>,
        aging_interval: Duration,
        top_priority: u32,
    ) -> Self {
        let mut state = Self::new(aging_interval, top_priority);
        state.entries = entries.into_iter().map(|e| (e.id, e)).collect();
        state
    }

    pub fn get(&self, id: EntryId) -> Option<&QueueEntry> {
        self.entries.get(&id)
    }

    /// Insert a new entry, rejecting a duplicate non-terminal (user, job) pair.
    pub fn insert(&mut self, entry: QueueEntry) -> EngineResult<EntryId> {
        if self.has_active(entry.user_id, &entry.job_id) {
            return Err(EngineError::DuplicateEntry {
                user_id: entry.user_id,
                job_id: entry.job_id,
            });
        }
        let id = entry.id;
        self.entries.insert(id, entry);
        Ok(id)
    }

    fn has_active(&self, user_id: UserId, job_id: &JobId) -> bool {
        self.entries
            .values()
            .any(|e| e.user_id == user_id && e.job_id == *job_id && !e.is_terminal())
    }

    /// Users that currently own an in-progress entry.
    fn busy_users(&self) -> HashSet<UserId> {
        self.entries
            .values()
            .filter(|e| e.status == ApplicationStatus::InProgress)
            .map(|e| e.user_id)
            .collect()
    }

    /// Priority after aging: one point per interval spent waiting while
    /// eligible, capped at the top tier.
    pub fn effective_priority(&self, entry: &QueueEntry, now: DateTime<Utc>) -> u32 {
        let eligible_since = match entry.scheduled_for {
            Some(at) if at > entry.created_at => at,
            _ => entry.created_at,
        };
        let waited = now.signed_duration_since(eligible_since);
        if waited <= Duration::zero() || self.aging_interval <= Duration::zero() {
            return entry.priority;
        }
        let bonus = (waited.num_milliseconds() / self.aging_interval.num_milliseconds().max(1))
            .clamp(0, u32::MAX as i64) as u32;
        entry
            .priority
            .saturating_add(bonus)
            .min(self.top_priority)
            .max(entry.priority)
    }

    /// Select the next dispatchable entry: status pending/scheduled, backoff
    /// elapsed, owner not already in progress, and the pacing policy permits.
    /// Ordering is effective priority descending, then FIFO by creation time.
    pub fn select_eligible<F>(&self, now: DateTime<Utc>, permit: F) -> Option<EntryId>
    where
        F: Fn(UserId) -> bool,
    {
        let busy = self.busy_users();

        self.entries
            .values()
            .filter(|e| e.status.is_dispatchable())
            .filter(|e| e.scheduled_for.map_or(true, |at| at <= now))
            .filter(|e| !busy.contains(&e.user_id))
            .filter(|e| permit(e.user_id))
            .min_by(|a, b| {
                let pa = self.effective_priority(a, now);
                let pb = self.effective_priority(b, now);
                // min_by with reversed priority gives highest priority first
                pb.cmp(&pa).then(a.created_at.cmp(&b.created_at))
            })
            .map(|e| e.id)
    }

    /// Check-and-set transition into InProgress.
    pub fn mark_dispatched(&mut self, id: EntryId, now: DateTime<Utc>) -> EngineResult<QueueEntry> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(EngineError::EntryNotFound(id))?;
        if !valid_transition(entry.status, ApplicationStatus::InProgress) {
            return Err(EngineError::InvalidState {
                from: entry.status,
                to: ApplicationStatus::InProgress,
            });
        }
        entry.status = ApplicationStatus::InProgress;
        entry.dispatched_at = Some(now);
        Ok(entry.clone())
    }

    /// User-issued cancel: only while still waiting. Once dispatched this
    /// fails and the caller must use the advisory abort instead.
    pub fn cancel(&mut self, id: EntryId, now: DateTime<Utc>) -> EngineResult<QueueEntry> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(EngineError::EntryNotFound(id))?;
        if !entry.status.is_dispatchable() {
            return Err(EngineError::InvalidState {
                from: entry.status,
                to: ApplicationStatus::Cancelled,
            });
        }
        entry.status = ApplicationStatus::Cancelled;
        entry.completed_at = Some(now);
        Ok(entry.clone())
    }

    /// Advisory abort for an in-flight entry; the executor honors it at the
    /// next step boundary.
    pub fn request_abort(&mut self, id: EntryId) -> EngineResult<QueueEntry> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(EngineError::EntryNotFound(id))?;
        if entry.status != ApplicationStatus::InProgress {
            return Err(EngineError::InvalidState {
                from: entry.status,
                to: ApplicationStatus::Cancelled,
            });
        }
        entry.abort_requested = true;
        Ok(entry.clone())
    }

    /// External re-enqueue after manual intervention (captcha solved).
    pub fn requeue_manual(&mut self, id: EntryId) -> EngineResult<QueueEntry> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(EngineError::EntryNotFound(id))?;
        if !valid_transition(entry.status, ApplicationStatus::Pending) {
            return Err(EngineError::InvalidState {
                from: entry.status,
                to: ApplicationStatus::Pending,
            });
        }
        entry.status = ApplicationStatus::Pending;
        entry.scheduled_for = None;
        Ok(entry.clone())
    }

    /// Apply a retry-controller resolution to an in-flight entry.
    pub fn apply_resolution(
        &mut self,
        id: EntryId,
        resolution: &Resolution,
        now: DateTime<Utc>,
    ) -> EngineResult<QueueEntry> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(EngineError::EntryNotFound(id))?;

        let target = resolution.target_status();
        if !valid_transition(entry.status, target) {
            return Err(EngineError::InvalidState {
                from: entry.status,
                to: target,
            });
        }

        match resolution {
            Resolution::Succeeded { attempts, .. } => {
                entry.attempts = *attempts;
                entry.status = ApplicationStatus::Succeeded;
                entry.completed_at = Some(now);
                entry.last_error = None;
            }
            Resolution::Retry {
                attempts,
                next_eligible,
                error,
            } => {
                entry.attempts = *attempts;
                entry.status = ApplicationStatus::Scheduled;
                entry.scheduled_for = Some(*next_eligible);
                entry.last_error = Some(error.clone());
            }
            Resolution::Failed { attempts, error } => {
                entry.attempts = *attempts;
                entry.status = ApplicationStatus::Failed;
                entry.completed_at = Some(now);
                entry.last_error = Some(error.clone());
            }
            Resolution::ManualAction => {
                entry.status = ApplicationStatus::NeedsManualAction;
                entry.last_error = Some(AttemptFailure::CaptchaDetected);
            }
            Resolution::Rescheduled { next_eligible } => {
                entry.status = ApplicationStatus::Scheduled;
                entry.scheduled_for = Some(*next_eligible);
                entry.last_error = Some(AttemptFailure::QuotaExceeded);
            }
            Resolution::Aborted => {
                entry.status = ApplicationStatus::Cancelled;
                entry.completed_at = Some(now);
            }
        }
        entry.abort_requested = false;
        Ok(entry.clone())
    }

    /// Crash recovery: any entry left InProgress by a dead worker re-enters
    /// as Scheduled, eligible immediately. Returns the repaired entries.
    pub fn recover_in_flight(&mut self, now: DateTime<Utc>) -> Vec<QueueEntry> {
        let mut recovered = Vec::new();
        for entry in self.entries.values_mut() {
            if entry.status == ApplicationStatus::InProgress {
                entry.status = ApplicationStatus::Scheduled;
                entry.scheduled_for = Some(now);
                entry.abort_requested = false;
                recovered.push(entry.clone());
            }
        }
        recovered
    }

    /// List a user's entries; waiting entries carry their queue position
    /// (1-based, dispatch order).
    pub fn list(&self, user_id: UserId, filter: QueueFilter, now: DateTime<Utc>) -> Vec<ListedEntry> {
        let mut waiting: Vec<&QueueEntry> = self
            .entries
            .values()
            .filter(|e| e.user_id == user_id && e.status.is_dispatchable())
            .collect();
        waiting.sort_by(|a, b| {
            let pa = self.effective_priority(a, now);
            let pb = self.effective_priority(b, now);
            pb.cmp(&pa).then(a.created_at.cmp(&b.created_at))
        });
        let position_of = |id: EntryId| waiting.iter().position(|e| e.id == id).map(|i| i + 1);

        let mut listed: Vec<ListedEntry> = self
            .entries
            .values()
            .filter(|e| e.user_id == user_id && filter.matches(e.status))
            .map(|e| ListedEntry {
                entry: e.clone(),
                position: position_of(e.id),
            })
            .collect();
        listed.sort_by(|a, b| a.entry.created_at.cmp(&b.entry.created_at));
        listed
    }

    /// Per-user counts by status.
    pub fn stats(&self, user_id: UserId) -> QueueStats {
        let mut stats = QueueStats::default();
        for entry in self.entries.values().filter(|e| e.user_id == user_id) {
            stats.record(entry.status);
        }
        stats
    }

    /// True while any entry could still produce work.
    pub fn has_active_entries(&self) -> bool {
        self.entries
            .values()
            .any(|e| !e.is_terminal() && e.status != ApplicationStatus::NeedsManualAction)
    }
}
