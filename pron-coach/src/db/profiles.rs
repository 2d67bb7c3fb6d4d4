//! Learner profile rows
//!
//! A profile is stored as one JSON document per learner with a version
//! counter. Writes are conditional on the version so concurrent writers
//! cannot silently overwrite each other.

use pron_common::{Error, Result};
use sqlx::{Row, SqlitePool};

use super::retry::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};
use crate::models::LearnerProfile;

fn to_json(profile: &LearnerProfile) -> Result<String> {
    serde_json::to_string(profile)
        .map_err(|e| Error::Internal(format!("Failed to serialize profile: {}", e)))
}

/// Load a profile and its stored version
pub async fn load_profile(
    pool: &SqlitePool,
    learner_id: &str,
) -> Result<Option<(LearnerProfile, u64)>> {
    let row = sqlx::query("SELECT version, profile FROM learner_profiles WHERE learner_id = ?")
        .bind(learner_id)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let version: i64 = row.get("version");
    let json: String = row.get("profile");
    let profile: LearnerProfile = serde_json::from_str(&json).map_err(|e| {
        Error::Internal(format!(
            "Stored profile for learner '{}' is corrupt: {}",
            learner_id, e
        ))
    })?;

    Ok(Some((profile, version as u64)))
}

/// Insert a first-version profile
///
/// Returns `false` if a row for the learner already exists.
pub async fn insert_profile(pool: &SqlitePool, profile: &LearnerProfile) -> Result<bool> {
    let json = to_json(profile)?;
    let created_at = profile.created_at.to_rfc3339();
    let updated_at = profile.updated_at.to_rfc3339();

    let result = retry_on_lock("insert_profile", DEFAULT_MAX_LOCK_WAIT_MS, || async {
        sqlx::query(
            r#"
            INSERT INTO learner_profiles (learner_id, version, profile, created_at, updated_at)
            VALUES (?, 1, ?, ?, ?)
            ON CONFLICT(learner_id) DO NOTHING
            "#,
        )
        .bind(&profile.learner_id)
        .bind(&json)
        .bind(&created_at)
        .bind(&updated_at)
        .execute(pool)
        .await
        .map_err(Error::from)
    })
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Replace a profile if its stored version still equals `expected_version`
///
/// Returns `false` when the version moved on (or the row vanished).
pub async fn update_profile(
    pool: &SqlitePool,
    profile: &LearnerProfile,
    expected_version: u64,
) -> Result<bool> {
    let json = to_json(profile)?;
    let updated_at = profile.updated_at.to_rfc3339();

    let result = retry_on_lock("update_profile", DEFAULT_MAX_LOCK_WAIT_MS, || async {
        sqlx::query(
            r#"
            UPDATE learner_profiles
            SET version = version + 1, profile = ?, updated_at = ?
            WHERE learner_id = ? AND version = ?
            "#,
        )
        .bind(&json)
        .bind(&updated_at)
        .bind(&profile.learner_id)
        .bind(expected_version as i64)
        .execute(pool)
        .await
        .map_err(Error::from)
    })
    .await?;

    Ok(result.rows_affected() == 1)
}

/// All stored learner ids, sorted
pub async fn list_learners(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT learner_id FROM learner_profiles ORDER BY learner_id")
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(|row| row.get("learner_id")).collect())
}
