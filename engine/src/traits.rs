//! Collaborator trait definitions with mockall annotations for testing
//!
//! These traits are the seams to every external system the pipeline talks
//! to: profile storage, the job feed, the browser automation driver, outcome
//! notification, and the durable queue backing. They are injected into the
//! dispatcher and executor, and mocked in tests.

use async_trait::async_trait;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use thiserror::Error;

use crate::error::EngineResult;
use shared::{ApplicationOutcome, CandidateProfile, JobId, JobPosting, QueueEntry, UserId};

/// Shared abort flag handed to the executor for one in-flight attempt.
/// Checked at step boundaries only; an attempt is never interrupted mid-step.
pub type CancelToken = Arc<AtomicBool>;

/// Submission strategy for one attempt, chosen by capability probing
/// in declaration order. Fixed for the attempt's lifetime once chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplyStrategy {
    /// The target exposes a structured submission endpoint.
    NativeApi,
    /// Resume/file-based upload form.
    StructuredUpload,
    /// Free-text fallback filling of arbitrary form fields.
    GenericForm,
}

impl ApplyStrategy {
    /// Probe order, highest fidelity first.
    pub const PROBE_ORDER: [ApplyStrategy; 3] =
        [Self::NativeApi, Self::StructuredUpload, Self::GenericForm];
}

/// Errors surfaced by the automation driver's primitive operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("element not found: {0}")]
    NotFound(String),

    #[error("captcha challenge presented")]
    Captcha,

    #[error("driver protocol error: {0}")]
    Protocol(String),
}

/// Fill-able form surface discovered on the current page
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormDescriptor {
    /// Field names the driver can address with `fill_field`.
    pub fields: Vec<String>,
    pub has_file_upload: bool,
}

/// One screening question found on the application form
#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningQuestion {
    pub id: String,
    pub prompt: String,
}

/// Confirmation details scraped from the success page
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationSnapshot {
    pub job_title: String,
    pub company: String,
}

/// Read-only access to candidate profiles
#[mockall::automock]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: UserId) -> EngineResult<CandidateProfile>;
}

/// Supplier of candidate job postings
///
/// The scorer and dispatcher never fetch postings themselves; they receive
/// them through this seam so a live board client and a static fixture are
/// interchangeable.
#[mockall::automock]
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn fetch_postings(&self) -> EngineResult<Vec<JobPosting>>;
}

/// Browser/automation driver primitives
///
/// The executor is driver-agnostic: it sequences these operations and maps
/// their failures into the attempt-failure taxonomy. Identity rotation is
/// implemented by the driver; its cadence is owned by the pacing policy.
#[mockall::automock]
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Capability probe: can this strategy handle the given posting URL?
    async fn probe(&self, strategy: ApplyStrategy, job_url: &str) -> Result<bool, DriverError>;

    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    async fn detect_form(&self) -> Result<FormDescriptor, DriverError>;

    async fn fill_field(&self, name: &str, value: &str) -> Result<(), DriverError>;

    async fn upload_resume(&self, path: &str) -> Result<(), DriverError>;

    async fn screening_questions(&self) -> Result<Vec<ScreeningQuestion>, DriverError>;

    async fn answer_question(&self, question_id: &str, answer: &str) -> Result<(), DriverError>;

    async fn submit(&self) -> Result<(), DriverError>;

    /// Look for a success indicator on the page after submission.
    /// `None` means no indicator was found (ambiguous outcome).
    async fn verify_confirmation(&self) -> Result<Option<ConfirmationSnapshot>, DriverError>;

    async fn rotate_identity(&self) -> Result<(), DriverError>;
}

/// Fire-and-forget outcome notification
#[mockall::automock]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_outcome(&self, user_id: UserId, job_id: JobId, outcome: ApplicationOutcome);
}

/// Durable backing for queue entries, surviving process restarts
#[mockall::automock]
#[async_trait]
pub trait QueueRepository: Send + Sync {
    async fn load_all(&self) -> EngineResult<Vec<QueueEntry>>;

    async fn persist(&self, entry: &QueueEntry) -> EngineResult<()>;
}
