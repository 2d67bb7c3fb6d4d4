//! Profile persistence boundary
//!
//! Saves are optimistic: the caller passes the version it loaded (or `None`
//! for a learner with no stored profile) and a save against a stale version
//! fails with [`AssessError::ProfileConflict`]. Versions start at 1 and
//! increase by one per successful save.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::db;
use crate::error::{AssessError, AssessResult};
use crate::models::LearnerProfile;

/// A profile together with the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProfile {
    pub profile: LearnerProfile,
    pub version: u64,
}

/// Durable storage for learner profiles
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn load(&self, learner_id: &str) -> AssessResult<Option<StoredProfile>>;

    /// Persist `profile`, returning its new version
    async fn save(
        &self,
        profile: &LearnerProfile,
        expected_version: Option<u64>,
    ) -> AssessResult<u64>;

    /// Every learner with a stored profile, sorted
    async fn learners(&self) -> AssessResult<Vec<String>>;
}

fn conflict(profile: &LearnerProfile, expected: Option<u64>) -> AssessError {
    AssessError::ProfileConflict {
        learner_id: profile.learner_id.clone(),
        expected,
    }
}

/// Process-local store, used in tests and for offline ingestion without a database
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, StoredProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn load(&self, learner_id: &str) -> AssessResult<Option<StoredProfile>> {
        Ok(self.profiles.read().await.get(learner_id).cloned())
    }

    async fn save(
        &self,
        profile: &LearnerProfile,
        expected_version: Option<u64>,
    ) -> AssessResult<u64> {
        let mut profiles = self.profiles.write().await;
        let current = profiles.get(&profile.learner_id).map(|stored| stored.version);

        if current != expected_version {
            return Err(conflict(profile, expected_version));
        }

        let version = current.map_or(1, |v| v + 1);
        profiles.insert(
            profile.learner_id.clone(),
            StoredProfile {
                profile: profile.clone(),
                version,
            },
        );
        Ok(version)
    }

    async fn learners(&self) -> AssessResult<Vec<String>> {
        let mut ids: Vec<String> = self.profiles.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// SQLite-backed store
#[derive(Debug, Clone)]
pub struct SqliteProfileStore {
    pool: SqlitePool,
}

impl SqliteProfileStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn load(&self, learner_id: &str) -> AssessResult<Option<StoredProfile>> {
        let loaded = db::profiles::load_profile(&self.pool, learner_id).await?;
        Ok(loaded.map(|(profile, version)| StoredProfile { profile, version }))
    }

    async fn save(
        &self,
        profile: &LearnerProfile,
        expected_version: Option<u64>,
    ) -> AssessResult<u64> {
        let written = match expected_version {
            None => db::profiles::insert_profile(&self.pool, profile).await?,
            Some(version) => db::profiles::update_profile(&self.pool, profile, version).await?,
        };

        if !written {
            debug!(
                learner_id = %profile.learner_id,
                expected_version = ?expected_version,
                "Profile version conflict"
            );
            return Err(conflict(profile, expected_version));
        }

        Ok(expected_version.map_or(1, |v| v + 1))
    }

    async fn learners(&self) -> AssessResult<Vec<String>> {
        Ok(db::profiles::list_learners(&self.pool).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_versions() {
        let store = InMemoryProfileStore::new();
        let profile = LearnerProfile::new("ana");

        assert!(store.load("ana").await.unwrap().is_none());
        assert_eq!(store.save(&profile, None).await.unwrap(), 1);
        assert_eq!(store.save(&profile, Some(1)).await.unwrap(), 2);

        let stored = store.load("ana").await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(store.learners().await.unwrap(), vec!["ana".to_string()]);
    }

    #[tokio::test]
    async fn test_in_memory_stale_version_conflicts() {
        let store = InMemoryProfileStore::new();
        let profile = LearnerProfile::new("ana");
        store.save(&profile, None).await.unwrap();

        let err = store.save(&profile, None).await.unwrap_err();
        assert!(matches!(err, AssessError::ProfileConflict { expected: None, .. }));

        store.save(&profile, Some(1)).await.unwrap();
        let err = store.save(&profile, Some(1)).await.unwrap_err();
        assert!(matches!(
            err,
            AssessError::ProfileConflict {
                expected: Some(1),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_sqlite_store_versions() {
        let store = SqliteProfileStore::new(db::init_memory_pool().await.unwrap());
        let profile = LearnerProfile::new("ben");

        assert_eq!(store.save(&profile, None).await.unwrap(), 1);
        assert!(store.save(&profile, None).await.is_err());
        assert_eq!(store.save(&profile, Some(1)).await.unwrap(), 2);
        assert_eq!(store.load("ben").await.unwrap().unwrap().version, 2);
    }
}
