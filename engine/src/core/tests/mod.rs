//! Unit tests for the pure core logic

mod matching;
mod queue;

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use shared::{
    CandidateProfile, ExperienceLevel, JobId, JobLocation, JobPosting, LocationPrefs, QueueEntry,
    SalaryRange, UserId,
};

/// Fixed reference instant so backoff/aging arithmetic is deterministic.
pub(super) fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub(super) fn sample_profile() -> CandidateProfile {
    CandidateProfile {
        user_id: UserId::new(),
        full_name: "Dana Field".to_string(),
        email: "dana@example.com".to_string(),
        phone: Some("555-0101".to_string()),
        skills: vec![
            "python".to_string(),
            "react".to_string(),
            "sql".to_string(),
            "docker".to_string(),
        ],
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

pub(super) fn sample_posting() -> JobPosting {
    JobPosting {
        id: JobId::new("job-100"),
        url: "https://jobs.example.com/100".to_string(),
        title: "Senior Backend Engineer".to_string(),
        company: "Initech".to_string(),
        required_skills: vec!["python".to_string(), "sql".to_string()],
        preferred_skills: vec!["docker".to_string()],
        salary: Some(SalaryRange {
            min: 130_000,
            max: 160_000,
        }),
        location: Some(JobLocation {
            latitude: Some(37.7749),
            longitude: Some(-122.4194),
            city: Some("San Francisco".to_string()),
            remote: true,
        }),
        experience_level: Some(ExperienceLevel::Senior),
    }
}

pub(super) fn sample_entry(user_id: UserId, job: &str) -> QueueEntry {
    QueueEntry::new(
        user_id,
        JobId::new(job),
        format!("https://jobs.example.com/{job}"),
        3,
        3,
        t0(),
    )
}
