use chrono::Duration;

use super::{sample_entry, t0};
use crate::core::backoff::Resolution;
use crate::core::queue::{valid_transition, QueueState};
use crate::error::EngineError;
use shared::{ApplicationStatus, AttemptFailure, ConfirmationReceipt, JobId, QueueFilter, UserId};

fn state() -> QueueState {
    QueueState::new(Duration::seconds(600), 5)
}

fn permit_all(_: UserId) -> bool {
    true
}

#[test]
fn test_terminal_statuses_have_no_outgoing_edges() {
    use ApplicationStatus::*;
    for from in [Succeeded, Failed, Cancelled] {
        for to in [
            Pending,
            Scheduled,
            InProgress,
            NeedsManualAction,
            Succeeded,
            Failed,
            Cancelled,
        ] {
            assert!(!valid_transition(from, to), "{from} -> {to} must be invalid");
        }
    }
}

#[test]
fn test_duplicate_active_entry_rejected() {
    // Arrange
    let mut queue = state();
    let user = UserId::new();
    queue.insert(sample_entry(user, "job-1")).unwrap();

    // Act
    let result = queue.insert(sample_entry(user, "job-1"));

    // Assert
    assert!(matches!(result, Err(EngineError::DuplicateEntry { .. })));
}

#[test]
fn test_reapply_allowed_after_terminal() {
    // Arrange: first entry for the job runs to failure
    let mut queue = state();
    let user = UserId::new();
    let id = queue.insert(sample_entry(user, "job-1")).unwrap();
    queue.mark_dispatched(id, t0()).unwrap();
    queue
        .apply_resolution(
            id,
            &Resolution::Failed {
                attempts: 3,
                error: AttemptFailure::PostingClosed,
            },
            t0(),
        )
        .unwrap();

    // Act + Assert: same (user, job) may be queued again
    assert!(queue.insert(sample_entry(user, "job-1")).is_ok());
}

#[test]
fn test_selection_prefers_priority_then_fifo() {
    // Arrange: low priority created first, high priority later, and a
    // same-priority pair to exercise the tie-break
    let mut queue = state();
    let low = sample_entry(UserId::new(), "job-low");
    let mut high = sample_entry(UserId::new(), "job-high");
    high.priority = 5;
    high.created_at = t0() + Duration::seconds(1);
    let low_id = queue.insert(low).unwrap();
    let high_id = queue.insert(high).unwrap();

    let now = t0() + Duration::seconds(2);

    // Act + Assert: priority wins over age
    assert_eq!(queue.select_eligible(now, permit_all), Some(high_id));
    queue.mark_dispatched(high_id, now).unwrap();
    assert_eq!(queue.select_eligible(now, permit_all), Some(low_id));
}

#[test]
fn test_same_user_entries_drain_highest_priority_first() {
    // Arrange: one user, priorities 1, 5, 3 in creation order
    let mut queue = state();
    let user = UserId::new();
    for (job, priority) in [("job-low", 1), ("job-high", 5), ("job-mid", 3)] {
        let mut entry = sample_entry(user, job);
        entry.priority = priority;
        queue.insert(entry).unwrap();
    }

    // Act: a lone worker claims and resolves one entry at a time
    let mut order = Vec::new();
    while let Some(id) = queue.select_eligible(t0(), permit_all) {
        let entry = queue.mark_dispatched(id, t0()).unwrap();
        order.push(entry.job_id);
        queue
            .apply_resolution(
                id,
                &Resolution::Succeeded {
                    attempts: 1,
                    receipt: ConfirmationReceipt {
                        job_title: "Senior Backend Engineer".to_string(),
                        company: "Initech".to_string(),
                        submitted_at: t0(),
                    },
                },
                t0(),
            )
            .unwrap();
    }

    // Assert: claimed strictly by descending priority
    let expected: Vec<JobId> = ["job-high", "job-mid", "job-low"]
        .iter()
        .map(|job| JobId::new(*job))
        .collect();
    assert_eq!(order, expected);
}

#[test]
fn test_fifo_breaks_priority_ties() {
    let mut queue = state();
    let first = sample_entry(UserId::new(), "job-a");
    let mut second = sample_entry(UserId::new(), "job-b");
    second.created_at = t0() + Duration::seconds(5);
    let first_id = queue.insert(first).unwrap();
    queue.insert(second).unwrap();

    let picked = queue.select_eligible(t0() + Duration::seconds(10), permit_all);

    assert_eq!(picked, Some(first_id));
}

#[test]
fn test_aging_promotes_but_caps_at_top_tier() {
    // Arrange: priority 1 entry waiting for many aging intervals
    let queue = state();
    let mut entry = sample_entry(UserId::new(), "job-1");
    entry.priority = 1;

    // Act: 3 intervals waited -> 1 + 3; 100 intervals -> capped at 5
    let after_three = queue.effective_priority(&entry, t0() + Duration::seconds(1800));
    let after_many = queue.effective_priority(&entry, t0() + Duration::seconds(60_000));

    // Assert
    assert_eq!(after_three, 4);
    assert_eq!(after_many, 5);
}

#[test]
fn test_aging_clock_restarts_from_backoff_schedule() {
    let queue = state();
    let mut entry = sample_entry(UserId::new(), "job-1");
    entry.priority = 1;
    entry.scheduled_for = Some(t0() + Duration::seconds(3600));

    // One aging interval after the backoff deadline, not after creation
    let effective = queue.effective_priority(&entry, t0() + Duration::seconds(3600 + 700));

    assert_eq!(effective, 2);
}

#[test]
fn test_backoff_deadline_gates_selection() {
    let mut queue = state();
    let mut entry = sample_entry(UserId::new(), "job-1");
    entry.status = ApplicationStatus::Scheduled;
    entry.scheduled_for = Some(t0() + Duration::seconds(60));
    let id = queue.insert(entry).unwrap();

    assert_eq!(queue.select_eligible(t0(), permit_all), None);
    assert_eq!(
        queue.select_eligible(t0() + Duration::seconds(60), permit_all),
        Some(id)
    );
}

#[test]
fn test_one_in_progress_per_user() {
    // Arrange: same user owns two entries, one already dispatched
    let mut queue = state();
    let user = UserId::new();
    let first = queue.insert(sample_entry(user, "job-1")).unwrap();
    queue.insert(sample_entry(user, "job-2")).unwrap();
    queue.mark_dispatched(first, t0()).unwrap();

    // Act + Assert: the second entry waits until the first resolves
    assert_eq!(queue.select_eligible(t0(), permit_all), None);
}

#[test]
fn test_pacing_gate_excludes_user_from_selection() {
    let mut queue = state();
    let throttled = UserId::new();
    let free = UserId::new();
    queue.insert(sample_entry(throttled, "job-1")).unwrap();
    let free_id = queue.insert(sample_entry(free, "job-2")).unwrap();

    let picked = queue.select_eligible(t0(), |user| user != throttled);

    assert_eq!(picked, Some(free_id));
}

#[test]
fn test_mark_dispatched_is_check_and_set() {
    let mut queue = state();
    let id = queue.insert(sample_entry(UserId::new(), "job-1")).unwrap();

    let entry = queue.mark_dispatched(id, t0()).unwrap();
    assert_eq!(entry.status, ApplicationStatus::InProgress);
    assert_eq!(entry.dispatched_at, Some(t0()));

    // Second dispatch of the same entry must fail
    assert!(matches!(
        queue.mark_dispatched(id, t0()),
        Err(EngineError::InvalidState { .. })
    ));
}

#[test]
fn test_cancel_only_before_dispatch() {
    let mut queue = state();
    let id = queue.insert(sample_entry(UserId::new(), "job-1")).unwrap();
    queue.mark_dispatched(id, t0()).unwrap();

    // Strict cancel fails once in progress
    assert!(matches!(
        queue.cancel(id, t0()),
        Err(EngineError::InvalidState { .. })
    ));

    // The advisory abort is the escape hatch
    let entry = queue.request_abort(id).unwrap();
    assert!(entry.abort_requested);
    assert_eq!(entry.status, ApplicationStatus::InProgress);
}

#[test]
fn test_cancel_pending_entry() {
    let mut queue = state();
    let id = queue.insert(sample_entry(UserId::new(), "job-1")).unwrap();

    let entry = queue.cancel(id, t0()).unwrap();

    assert_eq!(entry.status, ApplicationStatus::Cancelled);
    assert_eq!(entry.completed_at, Some(t0()));
}

#[test]
fn test_resolution_retry_reschedules_with_error() {
    let mut queue = state();
    let id = queue.insert(sample_entry(UserId::new(), "job-1")).unwrap();
    queue.mark_dispatched(id, t0()).unwrap();

    let retry_at = t0() + Duration::seconds(120);
    let entry = queue
        .apply_resolution(
            id,
            &Resolution::Retry {
                attempts: 1,
                next_eligible: retry_at,
                error: AttemptFailure::Navigation("timeout".to_string()),
            },
            t0(),
        )
        .unwrap();

    assert_eq!(entry.status, ApplicationStatus::Scheduled);
    assert_eq!(entry.attempts, 1);
    assert_eq!(entry.scheduled_for, Some(retry_at));
    assert!(matches!(
        entry.last_error,
        Some(AttemptFailure::Navigation(_))
    ));
}

#[test]
fn test_resolution_success_clears_error_history() {
    let mut queue = state();
    let mut seeded = sample_entry(UserId::new(), "job-1");
    seeded.last_error = Some(AttemptFailure::Navigation("timeout".to_string()));
    let id = queue.insert(seeded).unwrap();
    queue.mark_dispatched(id, t0()).unwrap();

    let entry = queue
        .apply_resolution(
            id,
            &Resolution::Succeeded {
                attempts: 2,
                receipt: ConfirmationReceipt {
                    job_title: "Senior Backend Engineer".to_string(),
                    company: "Initech".to_string(),
                    submitted_at: t0(),
                },
            },
            t0(),
        )
        .unwrap();

    assert_eq!(entry.status, ApplicationStatus::Succeeded);
    assert_eq!(entry.attempts, 2);
    assert!(entry.last_error.is_none());
    assert_eq!(entry.completed_at, Some(t0()));
}

#[test]
fn test_resolution_manual_parks_entry_without_consuming_attempt() {
    let mut queue = state();
    let id = queue.insert(sample_entry(UserId::new(), "job-1")).unwrap();
    queue.mark_dispatched(id, t0()).unwrap();

    let entry = queue
        .apply_resolution(id, &Resolution::ManualAction, t0())
        .unwrap();

    assert_eq!(entry.status, ApplicationStatus::NeedsManualAction);
    assert_eq!(entry.attempts, 0);
    assert_eq!(entry.last_error, Some(AttemptFailure::CaptchaDetected));

    // A human re-enqueues it
    let entry = queue.requeue_manual(id).unwrap();
    assert_eq!(entry.status, ApplicationStatus::Pending);
    assert!(entry.scheduled_for.is_none());
}

#[test]
fn test_resolution_quota_reschedule_keeps_attempt_budget() {
    let mut queue = state();
    let id = queue.insert(sample_entry(UserId::new(), "job-1")).unwrap();
    queue.mark_dispatched(id, t0()).unwrap();

    let resume_at = t0() + Duration::hours(4);
    let entry = queue
        .apply_resolution(
            id,
            &Resolution::Rescheduled {
                next_eligible: resume_at,
            },
            t0(),
        )
        .unwrap();

    assert_eq!(entry.status, ApplicationStatus::Scheduled);
    assert_eq!(entry.attempts, 0);
    assert_eq!(entry.scheduled_for, Some(resume_at));
}

#[test]
fn test_recover_in_flight_reschedules_immediately() {
    // Arrange: two entries stuck in progress after a crash, one untouched
    let mut queue = state();
    let a = queue.insert(sample_entry(UserId::new(), "job-1")).unwrap();
    let b = queue.insert(sample_entry(UserId::new(), "job-2")).unwrap();
    queue.insert(sample_entry(UserId::new(), "job-3")).unwrap();
    queue.mark_dispatched(a, t0()).unwrap();
    queue.mark_dispatched(b, t0()).unwrap();

    // Act
    let recovered = queue.recover_in_flight(t0() + Duration::seconds(30));

    // Assert
    assert_eq!(recovered.len(), 2);
    for entry in recovered {
        assert_eq!(entry.status, ApplicationStatus::Scheduled);
        assert_eq!(entry.scheduled_for, Some(t0() + Duration::seconds(30)));
    }
}

#[test]
fn test_list_positions_follow_dispatch_order() {
    // Arrange: one user with a waiting pair and a finished entry
    let mut queue = state();
    let user = UserId::new();
    let mut urgent = sample_entry(user, "job-urgent");
    urgent.priority = 5;
    urgent.created_at = t0() + Duration::seconds(1);
    let urgent_id = queue.insert(urgent).unwrap();
    let normal_id = queue.insert(sample_entry(user, "job-normal")).unwrap();
    let done_id = queue.insert(sample_entry(user, "job-done")).unwrap();
    queue.mark_dispatched(done_id, t0()).unwrap();

    // Act
    let listed = queue.list(user, QueueFilter::All, t0() + Duration::seconds(2));

    // Assert: urgent is position 1, normal 2, in-progress has none
    let position = |id| {
        listed
            .iter()
            .find(|l| l.entry.id == id)
            .and_then(|l| l.position)
    };
    assert_eq!(position(urgent_id), Some(1));
    assert_eq!(position(normal_id), Some(2));
    assert_eq!(position(done_id), None);
}

#[test]
fn test_stats_count_per_user_only() {
    let mut queue = state();
    let user = UserId::new();
    let id = queue.insert(sample_entry(user, "job-1")).unwrap();
    queue.insert(sample_entry(user, "job-2")).unwrap();
    queue.insert(sample_entry(UserId::new(), "job-3")).unwrap();
    queue.cancel(id, t0()).unwrap();

    let stats = queue.stats(user);

    assert_eq!(stats.pending, 1);
    assert_eq!(stats.cancelled, 1);
    assert_eq!(stats.total(), 2);
}
