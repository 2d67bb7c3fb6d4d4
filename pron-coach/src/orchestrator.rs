//! Assessment orchestrator
//!
//! Thin adapter in front of the [`SpeechEngine`]: builds the recognition
//! configuration, makes the one engine call under a deadline and a caller
//! cancellation token, and maps terminal states onto [`AssessError`].
//! It does no scoring; the raw payload goes to the parser untouched.
//!
//! The engine call is the only suspension point of the pipeline and the only
//! cancellable operation.

use pron_common::config::{AssessmentConfig, SpeechConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{
    EngineOutcome, Granularity, PhonemeAlphabet, RawRecognition, RecognitionConfig, SpeechEngine,
};
use crate::error::{AssessError, AssessResult};

/// Engine-independent recognition settings
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    pub language: String,
    pub phoneme_alphabet: PhonemeAlphabet,
    pub nbest_phoneme_count: u8,
    pub enable_miscue: bool,
    pub enable_prosody: bool,
    /// Deadline for a single engine call unless the request overrides it
    pub timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            phoneme_alphabet: PhonemeAlphabet::Ipa,
            nbest_phoneme_count: 5,
            enable_miscue: true,
            enable_prosody: true,
            timeout: Duration::from_secs(30),
        }
    }
}

impl OrchestratorConfig {
    /// Build from the TOML `[speech]` and `[assessment]` sections
    pub fn from_config(
        speech: &SpeechConfig,
        assessment: &AssessmentConfig,
    ) -> pron_common::Result<Self> {
        let phoneme_alphabet = assessment
            .phoneme_alphabet
            .parse::<PhonemeAlphabet>()
            .map_err(pron_common::Error::Config)?;

        Ok(Self {
            language: speech.language.clone(),
            phoneme_alphabet,
            nbest_phoneme_count: assessment.nbest_phoneme_count,
            enable_miscue: assessment.enable_miscue,
            enable_prosody: assessment.enable_prosody,
            timeout: pron_common::time::secs_to_duration(speech.timeout_secs),
        })
    }
}

/// One pronunciation attempt submitted for assessment
#[derive(Debug, Clone)]
pub struct AssessmentRequest {
    pub learner_id: String,
    /// WAV bytes
    pub audio: Vec<u8>,
    pub reference_text: String,
    pub granularity: Granularity,
    /// Caller-supplied deadline; falls back to the orchestrator default
    pub timeout: Option<Duration>,
}

impl AssessmentRequest {
    pub fn new(
        learner_id: impl Into<String>,
        audio: Vec<u8>,
        reference_text: impl Into<String>,
        granularity: Granularity,
    ) -> Self {
        Self {
            learner_id: learner_id.into(),
            audio,
            reference_text: reference_text.into(),
            granularity,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

pub struct AssessmentOrchestrator {
    engine: Arc<dyn SpeechEngine>,
    config: OrchestratorConfig,
}

impl AssessmentOrchestrator {
    pub fn new(engine: Arc<dyn SpeechEngine>, config: OrchestratorConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Engine configuration for a request
    pub fn recognition_config(&self, request: &AssessmentRequest) -> RecognitionConfig {
        RecognitionConfig {
            reference_text: request.reference_text.trim().to_string(),
            granularity: request.granularity,
            language: self.config.language.clone(),
            phoneme_alphabet: self.config.phoneme_alphabet,
            nbest_phoneme_count: self.config.nbest_phoneme_count,
            enable_miscue: self.config.enable_miscue,
            enable_prosody: self.config.enable_prosody,
        }
    }

    /// Call the engine once and return its raw recognition
    ///
    /// # Errors
    /// - `InvalidRequest` for empty audio or blank reference text (engine not called)
    /// - `Canceled` if `cancel` fires first
    /// - `EngineTimeout` if the deadline elapses first
    /// - `EngineCanceled` if the engine rejects or aborts the request
    pub async fn run(
        &self,
        request: &AssessmentRequest,
        cancel: &CancellationToken,
    ) -> AssessResult<RawRecognition> {
        if request.audio.is_empty() {
            return Err(AssessError::InvalidRequest("Audio is empty".to_string()));
        }
        if request.reference_text.trim().is_empty() {
            return Err(AssessError::InvalidRequest(
                "Reference text is required".to_string(),
            ));
        }

        let recognition = self.recognition_config(request);
        let deadline = request.timeout.unwrap_or(self.config.timeout);

        info!(
            learner_id = %request.learner_id,
            engine = self.engine.name(),
            granularity = %recognition.granularity,
            timeout_ms = deadline.as_millis() as u64,
            "Requesting pronunciation assessment"
        );

        let call = tokio::time::timeout(
            deadline,
            self.engine.recognize(&request.audio, &recognition),
        );

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(learner_id = %request.learner_id, "Assessment canceled by caller");
                return Err(AssessError::Canceled);
            }
            outcome = call => outcome,
        };

        match outcome {
            Err(_elapsed) => {
                warn!(
                    learner_id = %request.learner_id,
                    timeout_ms = deadline.as_millis() as u64,
                    "Speech engine timed out"
                );
                Err(AssessError::EngineTimeout(deadline))
            }
            Ok(Err(e)) => Err(e),
            Ok(Ok(EngineOutcome::Canceled {
                reason,
                error_code,
                details,
            })) => {
                warn!(
                    learner_id = %request.learner_id,
                    reason = %reason,
                    error_code = ?error_code,
                    details = %details,
                    "Speech engine canceled request"
                );
                Err(AssessError::EngineCanceled {
                    reason,
                    error_code,
                    details,
                })
            }
            Ok(Ok(EngineOutcome::Recognized(raw))) => {
                debug!(
                    learner_id = %request.learner_id,
                    payload_bytes = raw.payload.len(),
                    "Speech engine returned detailed result"
                );
                Ok(raw)
            }
        }
    }
}
