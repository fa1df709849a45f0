//! Scripted automation driver
//!
//! A deterministic stand-in for a real browser driver: it claims the generic
//! form strategy for every posting, serves a fixed application form, and
//! confirms submissions for postings it was seeded with. Failures can be
//! scripted per URL to exercise the retry and manual-action paths end to
//! end without a browser.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::traits::{
    ApplyStrategy, AutomationDriver, ConfirmationSnapshot, DriverError, FormDescriptor,
    ScreeningQuestion,
};
use shared::JobPosting;

/// Deterministic driver for local runs and integration tests
pub struct ScriptedDriver {
    /// URL -> (title, company) for postings that confirm successfully.
    confirmations: HashMap<String, (String, String)>,
    /// URL -> error raised when the form is inspected.
    failures: HashMap<String, DriverError>,
    current_url: Mutex<Option<String>>,
}

impl ScriptedDriver {
    /// Seed the driver so every given posting submits and confirms.
    pub fn from_postings(postings: &[JobPosting]) -> Self {
        let confirmations = postings
            .iter()
            .map(|p| (p.url.clone(), (p.title.clone(), p.company.clone())))
            .collect();
        Self {
            confirmations,
            failures: HashMap::new(),
            current_url: Mutex::new(None),
        }
    }

    /// Script a failure for one URL, surfaced at form detection.
    pub fn with_failure(mut self, url: impl Into<String>, error: DriverError) -> Self {
        self.failures.insert(url.into(), error);
        self
    }

    async fn current_url(&self) -> String {
        self.current_url.lock().await.clone().unwrap_or_default()
    }
}

#[async_trait]
impl AutomationDriver for ScriptedDriver {
    async fn probe(&self, strategy: ApplyStrategy, _job_url: &str) -> Result<bool, DriverError> {
        // No native endpoints in the scripted world; the form fallback
        // always claims the posting.
        Ok(strategy == ApplyStrategy::GenericForm)
    }

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        debug!("scripted driver navigating to {url}");
        *self.current_url.lock().await = Some(url.to_string());
        Ok(())
    }

    async fn detect_form(&self) -> Result<FormDescriptor, DriverError> {
        let url = self.current_url().await;
        if let Some(error) = self.failures.get(&url) {
            return Err(error.clone());
        }
        Ok(FormDescriptor {
            fields: vec![
                "full_name".to_string(),
                "email".to_string(),
                "phone".to_string(),
            ],
            has_file_upload: true,
        })
    }

    async fn fill_field(&self, name: &str, _value: &str) -> Result<(), DriverError> {
        debug!("scripted driver filling field {name}");
        Ok(())
    }

    async fn upload_resume(&self, path: &str) -> Result<(), DriverError> {
        debug!("scripted driver attaching resume {path}");
        Ok(())
    }

    async fn screening_questions(&self) -> Result<Vec<ScreeningQuestion>, DriverError> {
        Ok(vec![
            ScreeningQuestion {
                id: "q-authorized".to_string(),
                prompt: "Are you authorized to work in this country?".to_string(),
            },
            ScreeningQuestion {
                id: "q-experience".to_string(),
                prompt: "How many years of experience do you have?".to_string(),
            },
        ])
    }

    async fn answer_question(&self, question_id: &str, answer: &str) -> Result<(), DriverError> {
        debug!("scripted driver answering {question_id}: {answer}");
        Ok(())
    }

    async fn submit(&self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn verify_confirmation(&self) -> Result<Option<ConfirmationSnapshot>, DriverError> {
        let url = self.current_url().await;
        Ok(self
            .confirmations
            .get(&url)
            .map(|(job_title, company)| ConfirmationSnapshot {
                job_title: job_title.clone(),
                company: company.clone(),
            }))
    }

    async fn rotate_identity(&self) -> Result<(), DriverError> {
        debug!("scripted driver rotated identity");
        Ok(())
    }
}
