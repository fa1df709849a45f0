//! Core shared types and identifiers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a user of the pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> crate::SharedResult<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| crate::SharedError::InvalidUuid {
                input: s.to_string(),
            })
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a single queue entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> crate::SharedResult<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| crate::SharedError::InvalidUuid {
                input: s.to_string(),
            })
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a job posting, as assigned by its job board
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a queued application
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    /// Waiting in the queue, not yet eligible to run.
    #[default]
    Pending,
    /// Waiting for its scheduled-for time (backoff or staggered enqueue).
    Scheduled,
    /// A worker is currently executing an attempt.
    InProgress,
    /// Automation hit a captcha; a human must re-enqueue the entry.
    NeedsManualAction,
    /// The application was submitted and confirmed.
    Succeeded,
    /// All attempts exhausted or a terminal failure occurred.
    Failed,
    /// Cancelled by the user before dispatch.
    Cancelled,
}

impl ApplicationStatus {
    /// Terminal statuses never re-enter the state machine.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Statuses the dispatcher may pick up.
    pub fn is_dispatchable(&self) -> bool {
        matches!(self, Self::Pending | Self::Scheduled)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::NeedsManualAction => "needs_manual_action",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// One user's request to apply to one job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,
    pub user_id: UserId,
    pub job_id: JobId,
    pub job_url: String,

    /// Higher is more urgent. Derived from the match score or set explicitly.
    pub priority: u32,
    pub status: ApplicationStatus,

    /// Execution tries recorded so far.
    pub attempts: u32,
    pub max_attempts: u32,

    pub created_at: DateTime<Utc>,
    /// Earliest time the entry may be dispatched (backoff / stagger).
    pub scheduled_for: Option<DateTime<Utc>>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_error: Option<AttemptFailure>,

    /// Advisory flag: a cancel arrived after dispatch. The executor checks
    /// it at step boundaries and aborts cleanly.
    pub abort_requested: bool,
}

impl QueueEntry {
    pub fn new(
        user_id: UserId,
        job_id: JobId,
        job_url: impl Into<String>,
        priority: u32,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntryId::new(),
            user_id,
            job_id,
            job_url: job_url.into(),
            priority,
            status: ApplicationStatus::Pending,
            attempts: 0,
            max_attempts,
            created_at: now,
            scheduled_for: None,
            dispatched_at: None,
            completed_at: None,
            last_error: None,
            abort_requested: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Filter for queue listings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueFilter {
    All,
    /// Everything non-terminal.
    Active,
    WithStatus(ApplicationStatus),
}

impl QueueFilter {
    pub fn matches(&self, status: ApplicationStatus) -> bool {
        match self {
            Self::All => true,
            Self::Active => !status.is_terminal(),
            Self::WithStatus(s) => *s == status,
        }
    }
}

/// A listed entry together with its position among the user's waiting
/// entries (highest effective priority first); `None` once dispatched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListedEntry {
    pub entry: QueueEntry,
    pub position: Option<usize>,
}

/// Per-user counts by status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: usize,
    pub scheduled: usize,
    pub in_progress: usize,
    pub needs_manual_action: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl QueueStats {
    pub fn record(&mut self, status: ApplicationStatus) {
        match status {
            ApplicationStatus::Pending => self.pending += 1,
            ApplicationStatus::Scheduled => self.scheduled += 1,
            ApplicationStatus::InProgress => self.in_progress += 1,
            ApplicationStatus::NeedsManualAction => self.needs_manual_action += 1,
            ApplicationStatus::Succeeded => self.succeeded += 1,
            ApplicationStatus::Failed => self.failed += 1,
            ApplicationStatus::Cancelled => self.cancelled += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending
            + self.scheduled
            + self.in_progress
            + self.needs_manual_action
            + self.succeeded
            + self.failed
            + self.cancelled
    }
}

/// Failure raised by one automation attempt
///
/// The retry controller classifies these; nothing else in the pipeline
/// inspects the variants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptFailure {
    /// Page load / navigation failed
    Navigation(String),
    /// No recognizable application form on the page
    FormDetection(String),
    /// A form field could not be located or filled
    FieldFill(String),
    /// Submission failed, or the confirmation page was ambiguous
    Submission(String),
    /// A captcha challenge blocked automation
    CaptchaDetected,
    /// No strategy probe succeeded for this posting
    UnsupportedPlatform,
    /// The site reported an application already on file
    DuplicateApplication,
    /// The posting is closed or expired
    PostingClosed,
    /// Unexpected internal error inside the executor
    InternalFault(String),
    /// The pacing policy's daily cap was hit mid-flight
    QuotaExceeded,
}

/// How the retry controller treats a failure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
    /// Re-queue with backoff while attempts remain.
    Retryable,
    /// Fail the entry immediately.
    Terminal,
    /// Park the entry for human intervention.
    Manual,
    /// Re-queue at the next pacing window without consuming an attempt.
    Reschedule,
}

impl AttemptFailure {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Navigation(_)
            | Self::FormDetection(_)
            | Self::FieldFill(_)
            | Self::Submission(_)
            | Self::InternalFault(_) => FailureClass::Retryable,
            Self::CaptchaDetected => FailureClass::Manual,
            Self::UnsupportedPlatform | Self::DuplicateApplication | Self::PostingClosed => {
                FailureClass::Terminal
            }
            Self::QuotaExceeded => FailureClass::Reschedule,
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigation(msg) => write!(f, "navigation error: {msg}"),
            Self::FormDetection(msg) => write!(f, "form detection error: {msg}"),
            Self::FieldFill(msg) => write!(f, "field fill error: {msg}"),
            Self::Submission(msg) => write!(f, "submission error: {msg}"),
            Self::CaptchaDetected => write!(f, "captcha detected"),
            Self::UnsupportedPlatform => write!(f, "unsupported platform"),
            Self::DuplicateApplication => write!(f, "duplicate application"),
            Self::PostingClosed => write!(f, "posting closed"),
            Self::InternalFault(msg) => write!(f, "internal fault: {msg}"),
            Self::QuotaExceeded => write!(f, "daily quota exceeded"),
        }
    }
}

/// Seniority bands used by both profiles and postings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
    Lead,
    Principal,
}

impl ExperienceLevel {
    /// Ordinal rank for distance comparisons.
    pub fn rank(&self) -> i32 {
        match self {
            Self::Entry => 0,
            Self::Mid => 1,
            Self::Senior => 2,
            Self::Lead => 3,
            Self::Principal => 4,
        }
    }
}

/// Annual salary range in whole currency units
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: u32,
    pub max: u32,
}

/// Geographic point plus remote flags for a posting
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: Option<String>,
    pub remote: bool,
}

/// One job posting supplied by a job source
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: JobId,
    pub url: String,
    pub title: String,
    pub company: String,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub salary: Option<SalaryRange>,
    pub location: Option<JobLocation>,
    pub experience_level: Option<ExperienceLevel>,
}

/// Candidate location preferences
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationPrefs {
    pub latitude: f64,
    pub longitude: f64,
    /// Acceptable commute radius in kilometres.
    pub radius_km: f64,
    pub remote_ok: bool,
}

/// The slice of a user profile the pipeline needs
///
/// Supplied read-only by the profile store collaborator; resume parsing and
/// storage live outside this core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub user_id: UserId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub skills: Vec<String>,
    pub experience_level: Option<ExperienceLevel>,
    pub location: Option<LocationPrefs>,
    pub salary_min: Option<u32>,
    pub resume_path: Option<String>,
    /// Per-user overrides for screening answers, keyed by question keyword.
    pub screening_overrides: HashMap<String, String>,
}

/// Component scores making up a match result
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub skills: f64,
    pub experience: f64,
    pub location: f64,
    pub salary: f64,
}

/// Human-readable quality band for a match score
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchQuality {
    Excellent,
    Strong,
    Good,
    Fair,
    Weak,
    Poor,
}

impl MatchQuality {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::Excellent
        } else if score >= 80.0 {
            Self::Strong
        } else if score >= 70.0 {
            Self::Good
        } else if score >= 60.0 {
            Self::Fair
        } else if score >= 50.0 {
            Self::Weak
        } else {
            Self::Poor
        }
    }
}

impl fmt::Display for MatchQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Excellent => "excellent",
            Self::Strong => "strong",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Weak => "weak",
            Self::Poor => "poor",
        };
        write!(f, "{s}")
    }
}

/// Result of scoring one (profile, posting) pair
///
/// Created fresh per scoring request and never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Weighted overall score in [0, 100].
    pub overall_score: f64,
    pub components: ComponentScores,
    /// Ordered, human-readable contributing factors.
    pub factors: Vec<String>,
    pub quality: MatchQuality,
}

/// Artifact emitted on a confirmed submission
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationReceipt {
    pub job_title: String,
    pub company: String,
    pub submitted_at: DateTime<Utc>,
}

/// Terminal outcome reported to the notification collaborator
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ApplicationOutcome {
    Submitted(ConfirmationReceipt),
    Failed(AttemptFailure),
}

/// Daily pacing usage for one user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
    pub submitted_today: u32,
    pub daily_limit: u32,
    pub remaining: u32,
}
