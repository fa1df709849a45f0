//! Automation executor
//!
//! Runs one application attempt end to end: probe a strategy, navigate,
//! fill the form, answer screening questions, submit, and verify the
//! confirmation page. Every driver call is bounded by a step timeout, the
//! abort token is checked at step boundaries, and the pacing policy is
//! consulted again before each step that interacts with the site.

use chrono::Utc;
use rand::Rng;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::ExecutorConfig;
use crate::core::backoff::AttemptOutcome;
use crate::core::pacing::PacingPolicy;
use crate::traits::{ApplyStrategy, AutomationDriver, CancelToken, DriverError};
use shared::{AttemptFailure, CandidateProfile, ConfirmationReceipt, QueueEntry, UserId};

/// Where in the attempt a step failure occurred, for error mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Navigate,
    DetectForm,
    FillForm,
    Screening,
    Submit,
    Verify,
}

impl Phase {
    fn failure(self, message: String) -> AttemptFailure {
        match self {
            Phase::Navigate => AttemptFailure::Navigation(message),
            Phase::DetectForm => AttemptFailure::FormDetection(message),
            Phase::FillForm | Phase::Screening => AttemptFailure::FieldFill(message),
            Phase::Submit | Phase::Verify => AttemptFailure::Submission(message),
        }
    }
}

enum StepError {
    Driver(DriverError),
    TimedOut,
}

impl StepError {
    fn into_failure(self, phase: Phase) -> AttemptFailure {
        match self {
            StepError::TimedOut => phase.failure("step timed out".to_string()),
            StepError::Driver(DriverError::Captcha) => AttemptFailure::CaptchaDetected,
            StepError::Driver(DriverError::Protocol(msg)) => AttemptFailure::InternalFault(msg),
            StepError::Driver(DriverError::Navigation(msg))
            | StepError::Driver(DriverError::NotFound(msg)) => phase.failure(msg),
        }
    }
}

/// Runs one automation attempt against a driver
pub struct Executor<D: AutomationDriver> {
    driver: Arc<D>,
    pacing: Arc<Mutex<PacingPolicy>>,
    config: ExecutorConfig,
}

impl<D: AutomationDriver> Executor<D> {
    pub fn new(driver: Arc<D>, pacing: Arc<Mutex<PacingPolicy>>, config: ExecutorConfig) -> Self {
        Self {
            driver,
            pacing,
            config,
        }
    }

    /// Execute one attempt. Infrastructure trouble is folded into the
    /// failure taxonomy; this never errors outward.
    pub async fn run_attempt(
        &self,
        entry: &QueueEntry,
        profile: &CandidateProfile,
        cancel: &CancelToken,
    ) -> AttemptOutcome {
        // Abort may have been requested while the entry sat in the queue.
        if aborted(cancel) {
            return AttemptOutcome::Aborted;
        }

        match self.attempt_inner(entry, profile, cancel).await {
            Ok(outcome) => outcome,
            Err(failure) => AttemptOutcome::Failure(failure),
        }
    }

    async fn attempt_inner(
        &self,
        entry: &QueueEntry,
        profile: &CandidateProfile,
        cancel: &CancelToken,
    ) -> Result<AttemptOutcome, AttemptFailure> {
        self.pace(entry.user_id).await;
        let strategy = self.choose_strategy(&entry.job_url).await?;
        debug!("entry {}: applying via {strategy:?}", entry.id);

        self.pace(entry.user_id).await;
        self.step(Phase::Navigate, self.driver.navigate(&entry.job_url))
            .await?;
        if aborted(cancel) {
            return Ok(AttemptOutcome::Aborted);
        }

        let form = self
            .step(Phase::DetectForm, self.driver.detect_form())
            .await?;
        if aborted(cancel) {
            return Ok(AttemptOutcome::Aborted);
        }

        self.fill_form(profile, &form.fields).await?;
        if form.has_file_upload {
            match &profile.resume_path {
                Some(path) => {
                    self.pace(profile.user_id).await;
                    self.step(Phase::FillForm, self.driver.upload_resume(path))
                        .await?;
                }
                None => {
                    return Err(AttemptFailure::FieldFill(
                        "form requires a resume but none is on file".to_string(),
                    ))
                }
            }
        }
        if aborted(cancel) {
            return Ok(AttemptOutcome::Aborted);
        }

        self.answer_screening(profile).await?;

        // Another worker may have consumed the day's last submission slot
        // while this attempt was filling the form.
        let usage = {
            let pacing = self.pacing.lock().await;
            pacing.daily_usage(entry.user_id, Utc::now())
        };
        if usage.remaining == 0 {
            return Err(AttemptFailure::QuotaExceeded);
        }

        // Last abort point: past here the submission is in flight.
        if aborted(cancel) {
            return Ok(AttemptOutcome::Aborted);
        }
        self.pace(entry.user_id).await;
        self.step(Phase::Submit, self.driver.submit()).await?;

        let snapshot = self
            .step(Phase::Verify, self.driver.verify_confirmation())
            .await?;
        match snapshot {
            Some(snapshot) => {
                let receipt = ConfirmationReceipt {
                    job_title: snapshot.job_title,
                    company: snapshot.company,
                    submitted_at: Utc::now(),
                };
                self.after_submission(entry).await;
                Ok(AttemptOutcome::Success(receipt))
            }
            None => Err(AttemptFailure::Submission(
                "no confirmation indicator found after submit".to_string(),
            )),
        }
    }

    /// Probe strategies in fidelity order and take the first claimant.
    async fn choose_strategy(&self, job_url: &str) -> Result<ApplyStrategy, AttemptFailure> {
        for strategy in ApplyStrategy::PROBE_ORDER {
            match self.step(Phase::Navigate, self.driver.probe(strategy, job_url)).await {
                Ok(true) => return Ok(strategy),
                Ok(false) => continue,
                Err(AttemptFailure::CaptchaDetected) => {
                    return Err(AttemptFailure::CaptchaDetected)
                }
                // A broken probe just means this strategy cannot claim.
                Err(e) => debug!("probe {strategy:?} failed for {job_url}: {e}"),
            }
        }
        Err(AttemptFailure::UnsupportedPlatform)
    }

    async fn fill_form(
        &self,
        profile: &CandidateProfile,
        fields: &[String],
    ) -> Result<(), AttemptFailure> {
        for field in fields {
            let value = match field.as_str() {
                "full_name" | "name" => Some(profile.full_name.clone()),
                "email" => Some(profile.email.clone()),
                "phone" => profile.phone.clone(),
                other => {
                    debug!("skipping unrecognized form field {other}");
                    None
                }
            };
            if let Some(value) = value {
                self.pace(profile.user_id).await;
                self.step(Phase::FillForm, self.driver.fill_field(field, &value))
                    .await?;
            }
        }
        Ok(())
    }

    async fn answer_screening(&self, profile: &CandidateProfile) -> Result<(), AttemptFailure> {
        let questions = self
            .step(Phase::Screening, self.driver.screening_questions())
            .await?;
        let answers = AnswerBook::new(profile);

        for question in questions {
            let answer = answers.answer(&question.prompt);
            self.pace(profile.user_id).await;
            self.step(
                Phase::Screening,
                self.driver.answer_question(&question.id, &answer),
            )
            .await?;
        }
        Ok(())
    }

    /// Bookkeeping after a confirmed submission: count it toward the daily
    /// cap and rotate the automation identity at the configured cadence.
    async fn after_submission(&self, entry: &QueueEntry) {
        let rotate = {
            let mut pacing = self.pacing.lock().await;
            pacing.record_submission(entry.user_id, Utc::now())
        };
        if rotate {
            debug!("rotation cadence reached, rotating automation identity");
            if let Err(e) = self.driver.rotate_identity().await {
                warn!("identity rotation failed: {e}");
            }
        }
    }

    async fn step<T, F>(&self, phase: Phase, fut: F) -> Result<T, AttemptFailure>
    where
        F: Future<Output = Result<T, DriverError>>,
    {
        match timeout(self.config.step_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StepError::Driver(e).into_failure(phase)),
            Err(_) => Err(StepError::TimedOut.into_failure(phase)),
        }
    }

    /// Wait out the user's action spacing plus a human-like jitter, then
    /// record the action against the pacing policy.
    async fn pace(&self, user_id: UserId) {
        let wait = {
            let pacing = self.pacing.lock().await;
            pacing.wait_before_action(user_id, Utc::now())
        };
        let jitter = {
            let min = self.config.min_step_pause;
            let max = self.config.max_step_pause.max(min);
            if max.is_zero() {
                std::time::Duration::ZERO
            } else {
                let mut rng = rand::thread_rng();
                rng.gen_range(min..=max)
            }
        };
        let delay = wait + jitter;
        if !delay.is_zero() {
            debug!("pacing delay of {delay:?} before next site action");
            tokio::time::sleep(delay).await;
        }
        self.pacing.lock().await.record_action(user_id, Utc::now());
    }
}

fn aborted(cancel: &CancelToken) -> bool {
    cancel.load(Ordering::SeqCst)
}

/// Answers screening questions from profile data and keyword rules,
/// with per-user overrides taking precedence.
pub struct AnswerBook<'a> {
    profile: &'a CandidateProfile,
}

impl<'a> AnswerBook<'a> {
    pub fn new(profile: &'a CandidateProfile) -> Self {
        Self { profile }
    }

    pub fn answer(&self, prompt: &str) -> String {
        let prompt = prompt.to_lowercase();

        for (keyword, answer) in &self.profile.screening_overrides {
            if prompt.contains(&keyword.to_lowercase()) {
                return answer.clone();
            }
        }

        if prompt.contains("sponsor") || prompt.contains("visa") {
            "No".to_string()
        } else if prompt.contains("authorized") || prompt.contains("eligible") {
            "Yes".to_string()
        } else if prompt.contains("experience") {
            self.experience_years()
        } else if prompt.contains("relocat") {
            "Yes".to_string()
        } else if prompt.contains("salary") || prompt.contains("compensation") {
            match self.profile.salary_min {
                Some(minimum) => minimum.to_string(),
                None => "Negotiable".to_string(),
            }
        } else if prompt.contains("start") || prompt.contains("available") {
            "Immediately".to_string()
        } else {
            "Yes".to_string()
        }
    }

    fn experience_years(&self) -> String {
        use shared::ExperienceLevel::*;
        match self.profile.experience_level {
            Some(Entry) => "1",
            Some(Mid) => "3",
            Some(Senior) => "5",
            Some(Lead) => "8",
            Some(Principal) => "10",
            None => "1",
        }
        .to_string()
    }
}
