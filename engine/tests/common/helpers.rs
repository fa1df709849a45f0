//! Pipeline assembly helpers for integration tests

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{sleep, Instant};

use engine::services::{
    InMemoryProfileStore, LogNotifier, MemoryQueueRepository, QueueStore, ScriptedDriver,
};
use engine::traits::DriverError;
use engine::{Dispatcher, EngineConfig, Executor, PacingPolicy};
use shared::{CandidateProfile, JobPosting, QueueEntry};

use super::TestFixtures;

type TestDispatcher =
    Dispatcher<InMemoryProfileStore, ScriptedDriver, LogNotifier, MemoryQueueRepository>;

/// Builds a fully wired pipeline over in-memory services
pub struct PipelineBuilder {
    config: EngineConfig,
    postings: Vec<JobPosting>,
    failures: Vec<(String, DriverError)>,
    profiles: Vec<CandidateProfile>,
    seeded_entries: Vec<QueueEntry>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: TestFixtures::fast_config(),
            postings: Vec::new(),
            failures: Vec::new(),
            profiles: Vec::new(),
            seeded_entries: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_postings(mut self, postings: Vec<JobPosting>) -> Self {
        self.postings = postings;
        self
    }

    pub fn with_profile(mut self, profile: CandidateProfile) -> Self {
        self.profiles.push(profile);
        self
    }

    /// Script a driver failure for the posting with this URL.
    pub fn with_failure(mut self, url: impl Into<String>, error: DriverError) -> Self {
        self.failures.push((url.into(), error));
        self
    }

    /// Pre-load repository state, as if left by a previous process.
    pub fn with_seeded_entries(mut self, entries: Vec<QueueEntry>) -> Self {
        self.seeded_entries = entries;
        self
    }

    pub async fn build(self) -> Pipeline {
        let repository = MemoryQueueRepository::new();
        repository.seed(self.seeded_entries).await;
        let store = Arc::new(
            QueueStore::open(repository, &self.config)
                .await
                .expect("store open"),
        );

        let profiles = Arc::new(InMemoryProfileStore::new());
        for profile in self.profiles {
            profiles.insert(profile).await;
        }

        let mut driver = ScriptedDriver::from_postings(&self.postings);
        for (url, error) in self.failures {
            driver = driver.with_failure(url, error);
        }

        let pacing = Arc::new(Mutex::new(PacingPolicy::new(&self.config.pacing)));
        let executor = Arc::new(Executor::new(
            Arc::new(driver),
            pacing.clone(),
            self.config.executor,
        ));
        let dispatcher = Dispatcher::new(
            store.clone(),
            profiles.clone(),
            executor,
            Arc::new(LogNotifier::new()),
            pacing.clone(),
            &self.config,
        );

        Pipeline {
            store,
            pacing,
            dispatcher,
        }
    }
}

/// A wired pipeline plus handles the tests assert against
pub struct Pipeline {
    pub store: Arc<QueueStore<MemoryQueueRepository>>,
    pub pacing: Arc<Mutex<PacingPolicy>>,
    dispatcher: TestDispatcher,
}

impl Pipeline {
    /// Run the dispatch loop until no waiting or running work remains, or
    /// the time limit passes. Entries parked for manual action or scheduled
    /// far in the future count as drained only via the limit.
    pub async fn run_until_drained(self, limit: Duration) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let store = self.store.clone();

        let waiter = tokio::spawn(async move {
            let deadline = Instant::now() + limit;
            while store.has_active_entries().await && Instant::now() < deadline {
                sleep(Duration::from_millis(20)).await;
            }
            let _ = shutdown_tx.send(()).await;
        });

        self.dispatcher.run(shutdown_rx).await.expect("dispatcher run");
        waiter.await.expect("drain waiter");
    }
}
