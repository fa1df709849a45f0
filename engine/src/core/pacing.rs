//! Anti-detection pacing policy
//!
//! Per-user throttling state: a minimum spacing between automation actions,
//! a rolling 24-hour submission cap, and an identity-rotation cadence. The
//! dispatcher consults `permit` before handing out work; the executor gates
//! each automation step through `wait_before_action`/`record_action`.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};

use crate::config::PacingConfig;
use shared::{DailyUsage, UserId};

const WINDOW_HOURS: i64 = 24;

#[derive(Debug, Default)]
struct UserPacing {
    last_action: Option<DateTime<Utc>>,
    /// Submission timestamps inside the rolling window, oldest first.
    submissions: VecDeque<DateTime<Utc>>,
    submissions_since_rotation: u32,
}

/// Per-user throttle: action spacing, daily cap, rotation cadence
#[derive(Debug)]
pub struct PacingPolicy {
    min_action_interval: Duration,
    daily_limit: u32,
    rotation_cadence: u32,
    users: HashMap<UserId, UserPacing>,
}

impl PacingPolicy {
    pub fn new(config: &PacingConfig) -> Self {
        Self {
            min_action_interval: Duration::from_std(config.min_action_interval)
                .unwrap_or_else(|_| Duration::seconds(30)),
            daily_limit: config.daily_limit,
            rotation_cadence: config.rotation_cadence,
            users: HashMap::new(),
        }
    }

    fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::hours(WINDOW_HOURS)
    }

    fn submitted_in_window(&self, user_id: UserId, now: DateTime<Utc>) -> u32 {
        let start = Self::window_start(now);
        self.users
            .get(&user_id)
            .map(|u| u.submissions.iter().filter(|t| **t > start).count() as u32)
            .unwrap_or(0)
    }

    /// May this user receive a new dispatch right now?
    pub fn permit(&self, user_id: UserId, now: DateTime<Utc>) -> bool {
        if self.submitted_in_window(user_id, now) >= self.daily_limit {
            return false;
        }
        match self.users.get(&user_id).and_then(|u| u.last_action) {
            Some(last) => now.signed_duration_since(last) >= self.min_action_interval,
            None => true,
        }
    }

    /// Earliest instant a dispatch for this user could be permitted.
    pub fn next_permit_at(&self, user_id: UserId, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut at = now;

        if let Some(user) = self.users.get(&user_id) {
            if let Some(last) = user.last_action {
                at = at.max(last + self.min_action_interval);
            }
            if self.submitted_in_window(user_id, now) >= self.daily_limit {
                let start = Self::window_start(now);
                // The cap clears when the oldest in-window submission ages out.
                if let Some(oldest) = user.submissions.iter().find(|t| **t > start) {
                    at = at.max(*oldest + Duration::hours(WINDOW_HOURS));
                }
            }
        }
        at
    }

    /// How long the executor must sleep before its next automation action.
    pub fn wait_before_action(&self, user_id: UserId, now: DateTime<Utc>) -> std::time::Duration {
        let remaining = self
            .users
            .get(&user_id)
            .and_then(|u| u.last_action)
            .map(|last| self.min_action_interval - now.signed_duration_since(last))
            .unwrap_or_else(Duration::zero);
        remaining.to_std().unwrap_or(std::time::Duration::ZERO)
    }

    /// Mark an automation action, resetting the spacing clock.
    pub fn record_action(&mut self, user_id: UserId, now: DateTime<Utc>) {
        self.users.entry(user_id).or_default().last_action = Some(now);
    }

    /// Mark a confirmed submission. Returns true when the identity-rotation
    /// cadence is reached; the caller rotates and the counter resets.
    pub fn record_submission(&mut self, user_id: UserId, now: DateTime<Utc>) -> bool {
        let start = Self::window_start(now);
        let user = self.users.entry(user_id).or_default();

        user.submissions.push_back(now);
        while user.submissions.front().is_some_and(|t| *t <= start) {
            user.submissions.pop_front();
        }

        user.submissions_since_rotation += 1;
        if self.rotation_cadence > 0 && user.submissions_since_rotation >= self.rotation_cadence {
            user.submissions_since_rotation = 0;
            return true;
        }
        false
    }

    /// Rolling-window usage for status displays.
    pub fn daily_usage(&self, user_id: UserId, now: DateTime<Utc>) -> DailyUsage {
        let submitted = self.submitted_in_window(user_id, now);
        DailyUsage {
            submitted_today: submitted,
            daily_limit: self.daily_limit,
            remaining: self.daily_limit.saturating_sub(submitted),
        }
    }
}
