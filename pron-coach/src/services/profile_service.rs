//! Profile service
//!
//! Owns the load → merge → save cycle for learner profiles. Merges for the
//! same learner are serialized by a per-learner async lock inside this
//! process; the store's version check catches writers outside it (another
//! process sharing the database), and [`ProfileService::record_with_retry`]
//! reloads and re-merges when that happens. Different learners never block
//! each other.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::aggregator::PerformanceAggregator;
use crate::error::{AssessError, AssessResult};
use crate::models::{AssessmentResult, LearnerProfile};
use crate::store::ProfileStore;

/// One async mutex per learner id, created on demand
#[derive(Debug, Clone, Default)]
pub struct LearnerLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl LearnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `learner_id`
    pub async fn acquire(&self, learner_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries only referenced by the map have no holder and no waiter
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(learner_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of learners with a live lock entry
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
    aggregator: PerformanceAggregator,
    locks: LearnerLocks,
}

impl ProfileService {
    pub fn new(store: Arc<dyn ProfileStore>, aggregator: PerformanceAggregator) -> Self {
        Self {
            store,
            aggregator,
            locks: LearnerLocks::new(),
        }
    }

    pub fn aggregator(&self) -> &PerformanceAggregator {
        &self.aggregator
    }

    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }

    /// Current profile, if the learner has one
    pub async fn profile(&self, learner_id: &str) -> AssessResult<Option<LearnerProfile>> {
        Ok(self
            .store
            .load(learner_id)
            .await?
            .map(|stored| stored.profile))
    }

    /// Learners with stored profiles
    pub async fn learners(&self) -> AssessResult<Vec<String>> {
        self.store.learners().await
    }

    /// Merge one assessment into the learner's profile and persist it
    ///
    /// A learner without a stored profile starts from an empty one.
    ///
    /// # Errors
    /// `ProfileConflict` if a writer outside this service saved in between.
    pub async fn record(
        &self,
        learner_id: &str,
        result: &AssessmentResult,
    ) -> AssessResult<LearnerProfile> {
        if learner_id.trim().is_empty() {
            return Err(AssessError::InvalidRequest(
                "Learner id is required".to_string(),
            ));
        }

        let _guard = self.locks.acquire(learner_id).await;

        let (profile, expected_version) = match self.store.load(learner_id).await? {
            Some(stored) => (stored.profile, Some(stored.version)),
            None => {
                debug!(learner_id, "Creating new learner profile");
                (LearnerProfile::new(learner_id), None)
            }
        };

        let profile = self.aggregator.merge(profile, result);
        let version = self.store.save(&profile, expected_version).await?;

        info!(
            learner_id,
            assessment_id = %result.assessment_id,
            version,
            total_assessments = profile.total_assessments,
            "Recorded assessment"
        );

        Ok(profile)
    }

    /// [`record`](Self::record), reloading and re-merging after a version conflict
    ///
    /// Gives up after `max_attempts` (at least one attempt is always made)
    /// and returns the last conflict.
    pub async fn record_with_retry(
        &self,
        learner_id: &str,
        result: &AssessmentResult,
        max_attempts: u32,
    ) -> AssessResult<LearnerProfile> {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.record(learner_id, result).await {
                Err(err @ AssessError::ProfileConflict { .. }) if attempt < max_attempts => {
                    warn!(
                        learner_id,
                        attempt,
                        max_attempts,
                        error = %err,
                        "Profile conflict, reloading and merging again"
                    );
                }
                other => return other,
            }
        }
    }
}
