//! Candidate profile storage
//!
//! Profiles are owned by an external account system; this engine only reads
//! them. `InMemoryProfileStore` serves seeded profiles for local runs and
//! integration tests, and can load a seed file of profiles as JSON.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use tokio::sync::RwLock;

use crate::error::{EngineError, EngineResult};
use crate::traits::ProfileStore;
use shared::{CandidateProfile, UserId};

/// Profile store backed by a seeded in-memory map
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<UserId, CandidateProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, profile: CandidateProfile) {
        self.profiles
            .write()
            .await
            .insert(profile.user_id, profile);
    }

    pub async fn all(&self) -> Vec<CandidateProfile> {
        self.profiles.read().await.values().cloned().collect()
    }

    /// Load a JSON array of profiles.
    pub async fn load_seed(path: impl AsRef<Path>) -> EngineResult<Self> {
        let bytes = fs::read(path.as_ref()).await?;
        let profiles: Vec<CandidateProfile> = serde_json::from_slice(&bytes)?;

        let store = Self::new();
        for profile in profiles {
            store.insert(profile).await;
        }
        Ok(store)
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, user_id: UserId) -> EngineResult<CandidateProfile> {
        self.profiles
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or(EngineError::ProfileNotFound(user_id))
    }
}
