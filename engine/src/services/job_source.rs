//! Job posting supply
//!
//! `StaticJobSource` serves a fixed posting set, either built in code or
//! loaded from a JSON seed file. A live job-board client would implement the
//! same trait; the scorer and dispatcher cannot tell the difference.

use async_trait::async_trait;
use std::path::Path;
use tokio::fs;

use crate::error::EngineResult;
use crate::traits::JobSource;
use shared::JobPosting;

/// Fixed set of postings for local runs and tests
pub struct StaticJobSource {
    postings: Vec<JobPosting>,
}

impl StaticJobSource {
    pub fn new(postings: Vec<JobPosting>) -> Self {
        Self { postings }
    }

    /// Load a JSON array of postings.
    pub async fn load_seed(path: impl AsRef<Path>) -> EngineResult<Self> {
        let bytes = fs::read(path.as_ref()).await?;
        let postings: Vec<JobPosting> = serde_json::from_slice(&bytes)?;
        Ok(Self::new(postings))
    }

    pub fn postings(&self) -> &[JobPosting] {
        &self.postings
    }
}

#[async_trait]
impl JobSource for StaticJobSource {
    async fn fetch_postings(&self) -> EngineResult<Vec<JobPosting>> {
        Ok(self.postings.clone())
    }
}
