//! Main entry point for the application engine binary
//!
//! Wires the real service implementations together: scores the posting feed
//! against the candidate profile, queues the best matches, and runs the
//! dispatch loop until the queue drains or a shutdown signal arrives.

use clap::Parser;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

use engine::{
    services::{
        FileQueueRepository, InMemoryProfileStore, LogNotifier, QueueStore, ScriptedDriver,
        StaticJobSource,
    },
    Dispatcher, EngineConfig, EngineResult, Executor, JobSource, MatchEngine, PacingPolicy,
};
use shared::{
    logging, CandidateProfile, ExperienceLevel, JobId, JobLocation, JobPosting, LocationPrefs,
    SalaryRange, UserId,
};

/// Automated job application pipeline
#[derive(Parser)]
#[command(name = "engine")]
#[command(about = "Scores job postings and runs queued applications through automation")]
pub struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Directory holding the durable queue
    #[arg(long, default_value = "./queue-data")]
    pub data_dir: String,

    /// JSON file with an array of candidate profiles (demo profile if unset)
    #[arg(long)]
    pub profiles: Option<String>,

    /// JSON file with an array of job postings (demo postings if unset)
    #[arg(long)]
    pub jobs: Option<String>,

    /// How many of the best-scoring postings to queue
    #[arg(long, default_value = "5")]
    pub top: usize,

    /// Seconds between staggered eligibility of queued applications
    #[arg(long, default_value = "2")]
    pub stagger_secs: u64,

    /// Queue priority for this batch (1-5)
    #[arg(long)]
    pub priority: Option<u32>,
}

#[tokio::main]
async fn main() -> EngineResult<()> {
    let args = Args::parse();
    logging::init_tracing(Some(&args.log_level));
    logging::log_startup("application engine");

    let config = EngineConfig::default();
    config.validate()?;

    // Assemble the collaborators.
    let profiles = Arc::new(match &args.profiles {
        Some(path) => InMemoryProfileStore::load_seed(path).await?,
        None => demo_profiles().await,
    });
    let jobs = match &args.jobs {
        Some(path) => StaticJobSource::load_seed(path).await?,
        None => StaticJobSource::new(demo_postings()),
    };
    let driver = Arc::new(ScriptedDriver::from_postings(jobs.postings()));
    let notifier = Arc::new(LogNotifier::new());
    let pacing = Arc::new(Mutex::new(PacingPolicy::new(&config.pacing)));

    let repository = FileQueueRepository::open(&args.data_dir).await?;
    let store = Arc::new(QueueStore::open(repository, &config).await?);

    // Score the feed and queue the best matches for each known profile.
    let engine = MatchEngine::new(config.weights)?;
    let postings = jobs.fetch_postings().await?;
    for profile in profile_list(&profiles).await {
        let ranked = engine.rank_jobs(&profile, &postings, args.top);
        info!(
            "user {}: {} of {} postings selected",
            profile.user_id,
            ranked.len(),
            postings.len()
        );
        for (posting, result) in &ranked {
            info!(
                "  {:.1} ({}) {} at {}",
                result.overall_score, result.quality, posting.title, posting.company
            );
        }

        let batch = ranked
            .into_iter()
            .map(|(posting, _)| (posting.id, posting.url))
            .collect();
        let report = store
            .bulk_enqueue(
                profile.user_id,
                batch,
                args.priority,
                std::time::Duration::from_secs(args.stagger_secs),
            )
            .await?;
        info!(
            "user {}: {} queued, {} already pending",
            profile.user_id,
            report.queued.len(),
            report.skipped.len()
        );
    }

    // Run the dispatch loop until the queue drains or ctrl-c.
    let executor = Arc::new(Executor::new(driver, pacing.clone(), config.executor));
    let dispatcher = Dispatcher::new(
        store.clone(),
        profiles,
        executor,
        notifier,
        pacing,
        &config,
    );

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    let drain_store = store.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if !drain_store.has_active_entries().await {
                        info!("queue drained");
                        let _ = shutdown_tx.send(()).await;
                        break;
                    }
                }
                _ = signal::ctrl_c() => {
                    info!("interrupt received");
                    let _ = shutdown_tx.send(()).await;
                    break;
                }
            }
        }
    });

    dispatcher.run(shutdown_rx).await?;
    logging::log_shutdown("application engine");
    Ok(())
}

async fn profile_list(store: &InMemoryProfileStore) -> Vec<CandidateProfile> {
    store.all().await
}

/// Built-in demo profile used when no seed file is given.
async fn demo_profiles() -> InMemoryProfileStore {
    let store = InMemoryProfileStore::new();
    store
        .insert(CandidateProfile {
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
            resume_path: Some("./resume.pdf".to_string()),
            screening_overrides: HashMap::new(),
        })
        .await;
    store
}

/// Built-in demo posting feed.
fn demo_postings() -> Vec<JobPosting> {
    vec![
        JobPosting {
            id: JobId::new("demo-1"),
            url: "https://jobs.example.com/demo-1".to_string(),
            title: "Senior Backend Engineer".to_string(),
            company: "Initech".to_string(),
            required_skills: vec!["python".to_string(), "sql".to_string()],
            preferred_skills: vec!["docker".to_string()],
            salary: Some(SalaryRange {
                min: 130_000,
                max: 165_000,
            }),
            location: Some(JobLocation {
                latitude: None,
                longitude: None,
                city: None,
                remote: true,
            }),
            experience_level: Some(ExperienceLevel::Senior),
        },
        JobPosting {
            id: JobId::new("demo-2"),
            url: "https://jobs.example.com/demo-2".to_string(),
            title: "Full-Stack Developer".to_string(),
            company: "Hooli".to_string(),
            required_skills: vec!["javascript".to_string(), "node.js".to_string()],
            preferred_skills: vec!["python".to_string()],
            salary: Some(SalaryRange {
                min: 110_000,
                max: 140_000,
            }),
            location: Some(JobLocation {
                latitude: Some(37.7749),
                longitude: Some(-122.4194),
                city: Some("San Francisco".to_string()),
                remote: false,
            }),
            experience_level: Some(ExperienceLevel::Mid),
        },
        JobPosting {
            id: JobId::new("demo-3"),
            url: "https://jobs.example.com/demo-3".to_string(),
            title: "Data Platform Engineer".to_string(),
            company: "Pied Piper".to_string(),
            required_skills: vec![
                "python".to_string(),
                "sql".to_string(),
                "aws".to_string(),
            ],
            preferred_skills: vec!["kubernetes".to_string()],
            salary: Some(SalaryRange {
                min: 140_000,
                max: 180_000,
            }),
            location: Some(JobLocation {
                latitude: None,
                longitude: None,
                city: None,
                remote: true,
            }),
            experience_level: Some(ExperienceLevel::Senior),
        },
        JobPosting {
            id: JobId::new("demo-4"),
            url: "https://jobs.example.com/demo-4".to_string(),
            title: "Embedded Firmware Engineer".to_string(),
            company: "Aviato".to_string(),
            required_skills: vec!["c".to_string(), "rtos".to_string()],
            preferred_skills: vec![],
            salary: Some(SalaryRange {
                min: 100_000,
                max: 130_000,
            }),
            location: Some(JobLocation {
                latitude: Some(40.7128),
                longitude: Some(-74.0060),
                city: Some("New York".to_string()),
                remote: false,
            }),
            experience_level: Some(ExperienceLevel::Lead),
        },
    ]
}
