//! Azure Speech short-audio REST client
//!
//! Sends one WAV recording to the speech-to-text endpoint with a
//! `Pronunciation-Assessment` header and returns the detailed JSON result.
//!
//! # API Reference
//! - Host: `https://{region}.stt.speech.microsoft.com`
//! - Path: `/speech/recognition/conversation/cognitiveservices/v1`
//! - Query: `language={lang}&format=detailed`
//! - Header `Pronunciation-Assessment`: base64 of the assessment JSON
//!
//! Non-2xx responses and any `RecognitionStatus` other than `Success` are
//! reported as [`EngineOutcome::Canceled`] with the engine's detail verbatim.
//! No retries and no client-side timeout; the orchestrator bounds the call.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use super::{EngineOutcome, RawRecognition, RecognitionConfig, SpeechEngine};
use crate::error::{AssessError, AssessResult};
use crate::parser::EnginePayload;

/// WAV / PCM 16 kHz mono, the format the short-audio endpoint expects
const AUDIO_CONTENT_TYPE: &str = "audio/wav; codecs=audio/pcm; samplerate=16000";

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

const ASSESSMENT_HEADER: &str = "Pronunciation-Assessment";

/// Azure Speech REST client
pub struct AzureSpeechClient {
    http_client: Client,
    subscription_key: String,
    endpoint: String,
}

impl AzureSpeechClient {
    /// Create a client for the public endpoint of `region`
    pub fn new(subscription_key: String, region: &str) -> AssessResult<Self> {
        let region = region.trim();
        if region.is_empty() {
            return Err(AssessError::InvalidRequest(
                "Azure Speech region is empty".to_string(),
            ));
        }
        Self::with_endpoint(subscription_key, regional_endpoint(region))
    }

    /// Create a client against an explicit endpoint (private link, proxy, test server)
    pub fn with_endpoint(subscription_key: String, endpoint: String) -> AssessResult<Self> {
        if subscription_key.trim().is_empty() {
            return Err(AssessError::InvalidRequest(
                "Azure Speech subscription key is empty".to_string(),
            ));
        }

        let http_client = Client::builder().build().map_err(|e| {
            AssessError::Common(pron_common::Error::Config(format!(
                "Failed to create HTTP client: {}",
                e
            )))
        })?;

        Ok(Self {
            http_client,
            subscription_key,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SpeechEngine for AzureSpeechClient {
    fn name(&self) -> &'static str {
        "AzureSpeech"
    }

    async fn recognize(
        &self,
        audio: &[u8],
        config: &RecognitionConfig,
    ) -> AssessResult<EngineOutcome> {
        debug!(
            endpoint = %self.endpoint,
            audio_bytes = audio.len(),
            granularity = %config.granularity,
            language = %config.language,
            "Submitting audio to Azure Speech"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[("language", config.language.as_str()), ("format", "detailed")])
            .header(SUBSCRIPTION_KEY_HEADER, &self.subscription_key)
            .header(reqwest::header::CONTENT_TYPE, AUDIO_CONTENT_TYPE)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(ASSESSMENT_HEADER, assessment_header(config))
            .body(audio.to_vec())
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Azure Speech request failed");
                return Ok(EngineOutcome::Canceled {
                    reason: "ConnectionFailure".to_string(),
                    error_code: None,
                    details: e.to_string(),
                });
            }
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Ok(EngineOutcome::Canceled {
                    reason: "ConnectionFailure".to_string(),
                    error_code: Some(status.to_string()),
                    details: format!("Failed to read response body: {}", e),
                })
            }
        };

        Ok(outcome_from_response(status, body))
    }
}

/// Public short-audio endpoint for a region
fn regional_endpoint(region: &str) -> String {
    format!(
        "https://{}.stt.speech.microsoft.com/speech/recognition/conversation/cognitiveservices/v1",
        region
    )
}

/// Base64-encoded assessment parameters
fn assessment_header(config: &RecognitionConfig) -> String {
    let params = json!({
        "ReferenceText": config.reference_text,
        "GradingSystem": "HundredMark",
        "Granularity": config.granularity.engine_name(),
        "Dimension": "Comprehensive",
        "EnableMiscue": config.enable_miscue,
        "EnableProsodyAssessment": config.enable_prosody,
        "PhonemeAlphabet": config.phoneme_alphabet.engine_name(),
        "NBestPhonemeCount": config.nbest_phoneme_count,
    });
    STANDARD.encode(params.to_string())
}

/// Translate an HTTP status and body into the engine outcome
fn outcome_from_response(status: u16, body: String) -> EngineOutcome {
    if !(200..300).contains(&status) {
        return EngineOutcome::Canceled {
            reason: "Error".to_string(),
            error_code: Some(status.to_string()),
            details: body,
        };
    }

    // An undecodable body is still handed to the parser, which owns structural errors
    let envelope: EnginePayload = serde_json::from_str(&body).unwrap_or_default();

    match envelope.recognition_status.as_deref() {
        Some("Success") | None => {}
        Some(other) => {
            return EngineOutcome::Canceled {
                reason: other.to_string(),
                error_code: None,
                details: format!("Recognition ended with status {}", other),
            }
        }
    }

    let recognized_text = envelope.transcription().unwrap_or_default();

    EngineOutcome::Recognized(RawRecognition {
        recognized_text,
        payload: body,
    })
}
