//! Error types for pron-coach
//!
//! Structural problems with engine output, engine-side failures, caller
//! cancellation and profile contention are all distinct variants so callers
//! can decide what to retry.

use std::time::Duration;
use thiserror::Error;

/// Assessment pipeline error
#[derive(Debug, Error)]
pub enum AssessError {
    /// Engine output lacks the structure needed to score any word.
    /// Never merged into a profile.
    #[error("Malformed assessment result: {0}")]
    MalformedResult(String),

    /// Engine rejected or aborted the request (bad audio, quota, auth, ...)
    #[error(
        "Speech engine canceled the request: {reason} (code: {}, details: {details})",
        .error_code.as_deref().unwrap_or("none")
    )]
    EngineCanceled {
        reason: String,
        error_code: Option<String>,
        details: String,
    },

    /// No engine response within the caller's bound
    #[error("Speech engine did not respond within {0:?}")]
    EngineTimeout(Duration),

    /// Caller canceled while the engine call was in flight
    #[error("Assessment canceled by caller")]
    Canceled,

    /// Stored profile version moved on between load and save
    #[error("Learner '{learner_id}' profile changed concurrently (expected version {expected:?})")]
    ProfileConflict {
        learner_id: String,
        expected: Option<u64>,
    },

    /// Request rejected before reaching the engine
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Store, configuration or I/O failure (pron-common error)
    #[error("Common error: {0}")]
    Common(#[from] pron_common::Error),
}

impl AssessError {
    /// Failures a caller may reasonably retry as-is
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AssessError::EngineTimeout(_) | AssessError::ProfileConflict { .. }
        )
    }
}

/// Result type for the assessment pipeline
pub type AssessResult<T> = Result<T, AssessError>;
