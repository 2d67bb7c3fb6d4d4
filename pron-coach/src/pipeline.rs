//! Assessment pipeline
//!
//! Wires the orchestrator, parser and profile service together:
//! engine call → raw payload → [`AssessmentResult`] → merged
//! [`LearnerProfile`]. A result that fails to parse never reaches the
//! profile.
//!
//! The orchestrator is optional so captured payloads can be ingested
//! without engine credentials.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{AssessError, AssessResult};
use crate::models::{AssessmentResult, LearnerProfile};
use crate::orchestrator::{AssessmentOrchestrator, AssessmentRequest};
use crate::parser::{EnginePayload, ResultParser};
use crate::services::ProfileService;

/// Default number of save attempts when another writer updates the same profile
pub const DEFAULT_MERGE_ATTEMPTS: u32 = 3;

/// Scored attempt and the learner profile it was merged into
#[derive(Debug, Clone)]
pub struct AssessmentOutcome {
    pub result: AssessmentResult,
    pub profile: LearnerProfile,
}

pub struct AssessmentPipeline {
    orchestrator: Option<AssessmentOrchestrator>,
    parser: ResultParser,
    profiles: ProfileService,
    merge_attempts: u32,
}

impl AssessmentPipeline {
    /// Pipeline without an engine: only [`ingest`](Self::ingest) is usable
    pub fn offline(parser: ResultParser, profiles: ProfileService) -> Self {
        Self {
            orchestrator: None,
            parser,
            profiles,
            merge_attempts: DEFAULT_MERGE_ATTEMPTS,
        }
    }

    pub fn new(
        orchestrator: AssessmentOrchestrator,
        parser: ResultParser,
        profiles: ProfileService,
    ) -> Self {
        Self {
            orchestrator: Some(orchestrator),
            ..Self::offline(parser, profiles)
        }
    }

    pub fn with_merge_attempts(mut self, attempts: u32) -> Self {
        self.merge_attempts = attempts.max(1);
        self
    }

    pub fn profiles(&self) -> &ProfileService {
        &self.profiles
    }

    pub fn parser(&self) -> &ResultParser {
        &self.parser
    }

    /// Score one recording without touching the learner's profile
    pub async fn assess(
        &self,
        request: &AssessmentRequest,
        cancel: &CancellationToken,
    ) -> AssessResult<AssessmentResult> {
        let orchestrator = self.orchestrator.as_ref().ok_or_else(|| {
            AssessError::InvalidRequest("No speech engine configured".to_string())
        })?;
        let raw = orchestrator.run(request, cancel).await?;
        self.parser.parse_json(&raw.payload, &raw.recognized_text)
    }

    /// Score one recording and merge it into the learner's profile
    pub async fn assess_and_record(
        &self,
        request: &AssessmentRequest,
        cancel: &CancellationToken,
    ) -> AssessResult<AssessmentOutcome> {
        let result = self.assess(request, cancel).await?;
        self.record(&request.learner_id, result).await
    }

    /// Merge a previously captured engine payload
    ///
    /// `recognized_text` falls back to the payload's own `DisplayText`, then
    /// to the best candidate's `Display`.
    pub async fn ingest(
        &self,
        learner_id: &str,
        payload_json: &str,
        recognized_text: Option<&str>,
    ) -> AssessResult<AssessmentOutcome> {
        let payload: EnginePayload = serde_json::from_str(payload_json).map_err(|e| {
            AssessError::MalformedResult(format!("Engine payload is not valid JSON: {}", e))
        })?;

        let text = match recognized_text {
            Some(text) => text.to_string(),
            None => payload.transcription().unwrap_or_default(),
        };

        let result = self.parser.parse(&payload, &text)?;
        info!(
            learner_id,
            assessment_id = %result.assessment_id,
            words = result.words.len(),
            "Ingesting captured assessment"
        );
        self.record(learner_id, result).await
    }

    async fn record(
        &self,
        learner_id: &str,
        result: AssessmentResult,
    ) -> AssessResult<AssessmentOutcome> {
        let profile = self
            .profiles
            .record_with_retry(learner_id, &result, self.merge_attempts)
            .await?;
        Ok(AssessmentOutcome { result, profile })
    }
}
