//! Concurrent merges for the same learner must not lose updates

use chrono::Utc;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::task::JoinSet;
use uuid::Uuid;

use pron_coach::aggregator::PerformanceAggregator;
use pron_coach::models::{AssessmentResult, ErrorType, PhonemeScore, WordScore};
use pron_coach::services::ProfileService;
use pron_coach::store::{InMemoryProfileStore, ProfileStore, SqliteProfileStore};

fn theta_attempt(accuracy: f64) -> AssessmentResult {
    AssessmentResult {
        assessment_id: Uuid::new_v4(),
        recognized_text: "thin".to_string(),
        accuracy_score: accuracy,
        fluency_score: 100.0,
        pronunciation_score: accuracy,
        words: vec![WordScore {
            word: "thin".to_string(),
            accuracy_score: accuracy,
            error_type: ErrorType::None,
            phonemes: vec![PhonemeScore {
                phoneme: "θ".to_string(),
                accuracy_score: accuracy,
                confusions: Vec::new(),
            }],
            timestamp: Utc::now(),
        }],
        assessed_at: Utc::now(),
    }
}

fn service(store: Arc<dyn ProfileStore>) -> Arc<ProfileService> {
    Arc::new(ProfileService::new(store, PerformanceAggregator::default()))
}

#[tokio::test]
async fn test_concurrent_merges_in_memory() {
    let service = service(Arc::new(InMemoryProfileStore::new()));
    let mut join_set = JoinSet::new();

    for i in 0..20 {
        let service = Arc::clone(&service);
        join_set.spawn(async move {
            service
                .record("ana", &theta_attempt(f64::from(i) * 5.0))
                .await
                .map(|_| ())
        });
    }

    while let Some(joined) = join_set.join_next().await {
        joined.unwrap().unwrap();
    }

    let profile = service.profile("ana").await.unwrap().unwrap();
    assert_eq!(profile.total_assessments, 20);

    let theta = profile.phoneme("θ").unwrap();
    assert_eq!(theta.total_attempts, 20);
    // Mean of 0, 5, ..., 95
    assert!((theta.average_accuracy - 47.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_different_learners_do_not_interfere() {
    let service = service(Arc::new(InMemoryProfileStore::new()));
    let mut join_set = JoinSet::new();

    for learner in ["ana", "ben", "cho"] {
        for _ in 0..5 {
            let service = Arc::clone(&service);
            join_set.spawn(async move {
                service
                    .record(learner, &theta_attempt(80.0))
                    .await
                    .map(|_| ())
            });
        }
    }

    while let Some(joined) = join_set.join_next().await {
        joined.unwrap().unwrap();
    }

    for learner in ["ana", "ben", "cho"] {
        let profile = service.profile(learner).await.unwrap().unwrap();
        assert_eq!(profile.total_assessments, 5);
    }
    assert_eq!(service.learners().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_two_services_sharing_sqlite_lose_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("profiles.db");
    let pool = pron_coach::db::init_database_pool(&db_path).await.unwrap();

    // Separate services have separate learner locks, like two processes
    let first = service(Arc::new(SqliteProfileStore::new(pool.clone())));
    let second = service(Arc::new(SqliteProfileStore::new(pool)));

    let mut join_set = JoinSet::new();
    for i in 0..20 {
        let service = if i % 2 == 0 {
            Arc::clone(&first)
        } else {
            Arc::clone(&second)
        };
        join_set.spawn(async move {
            service
                .record_with_retry("ana", &theta_attempt(60.0), 25)
                .await
                .map(|_| ())
        });
    }

    while let Some(joined) = join_set.join_next().await {
        joined.unwrap().unwrap();
    }

    let profile = first.profile("ana").await.unwrap().unwrap();
    assert_eq!(profile.total_assessments, 20);
    assert_eq!(profile.phoneme("θ").unwrap().total_attempts, 20);
}
