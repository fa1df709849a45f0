//! Test fixtures: profiles, postings, and tuned configurations

use std::collections::HashMap;
use std::time::Duration;

use engine::config::{DispatchConfig, ExecutorConfig, PacingConfig, RetryConfig};
use engine::EngineConfig;
use shared::{
    CandidateProfile, ExperienceLevel, JobId, JobLocation, JobPosting, LocationPrefs, SalaryRange,
    UserId,
};

pub struct TestFixtures;

impl TestFixtures {
    /// Configuration tuned so tests run in milliseconds: tight polling, tiny
    /// backoff, no pacing gaps, no human pauses.
    pub fn fast_config() -> EngineConfig {
        EngineConfig {
            retry: RetryConfig {
                max_attempts: 2,
                base_delay: Duration::from_millis(20),
            },
            pacing: PacingConfig {
                min_action_interval: Duration::ZERO,
                daily_limit: 100,
                rotation_cadence: 5,
            },
            dispatch: DispatchConfig {
                worker_count: 2,
                dispatch_interval: Duration::from_millis(10),
                aging_interval: Duration::from_secs(600),
                top_priority: 5,
                default_priority: 3,
            },
            executor: ExecutorConfig {
                step_timeout: Duration::from_secs(2),
                min_step_pause: Duration::ZERO,
                max_step_pause: Duration::ZERO,
            },
            ..EngineConfig::default()
        }
    }

    pub fn profile(user_id: UserId) -> CandidateProfile {
        CandidateProfile {
            user_id,
            full_name: "Dana Field".to_string(),
            email: "dana@example.com".to_string(),
            phone: Some("555-0101".to_string()),
            skills: vec!["python".to_string(), "sql".to_string()],
            experience_level: Some(ExperienceLevel::Senior),
            location: Some(LocationPrefs {
                latitude: 37.7749,
                longitude: -122.4194,
                radius_km: 50.0,
                remote_ok: true,
            }),
            salary_min: Some(120_000),
            resume_path: Some("/tmp/resume.pdf".to_string()),
            screening_overrides: HashMap::new(),
        }
    }

    pub fn posting(id: &str) -> JobPosting {
        JobPosting {
            id: JobId::new(id),
            url: format!("https://jobs.example.com/{id}"),
            title: format!("Role {id}"),
            company: "Initech".to_string(),
            required_skills: vec!["python".to_string()],
            preferred_skills: vec![],
            salary: Some(SalaryRange {
                min: 130_000,
                max: 160_000,
            }),
            location: Some(JobLocation {
                latitude: None,
                longitude: None,
                city: None,
                remote: true,
            }),
            experience_level: Some(ExperienceLevel::Senior),
        }
    }

    pub fn postings(ids: &[&str]) -> Vec<JobPosting> {
        ids.iter().map(|id| Self::posting(id)).collect()
    }
}
