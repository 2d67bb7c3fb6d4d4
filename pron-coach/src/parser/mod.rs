//! Result parser
//!
//! Converts the engine's detailed recognition payload into an
//! [`AssessmentResult`]. All optional-field handling lives here:
//!
//! - Structural gaps are fatal ([`AssessError::MalformedResult`]): no candidate
//!   list, an empty candidate list, a missing or empty word list, a word
//!   without text, or JSON that does not decode.
//! - Missing numeric fields are not errors; they become 0 after normalization.
//! - Missing nested collections become empty vectors.
//!
//! The best candidate is index 0; the engine has already ranked them.
//! Scores nested under `PronunciationAssessment` win over scores placed
//! inline on the same element, so SDK and REST results parse alike.

pub mod normalize;
pub mod payload;

pub use normalize::ScoreScale;
pub use payload::EnginePayload;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::{AssessError, AssessResult};
use crate::models::{AssessmentResult, ErrorType, PhonemeConfusion, PhonemeScore, WordScore};
use payload::{RawConfusion, RawPhoneme, RawSummary, RawWord};

/// Parser for one engine's detailed results
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultParser {
    scale: ScoreScale,
}

impl ResultParser {
    /// Create a parser for an engine reporting scores on `scale`
    pub fn new(scale: ScoreScale) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> ScoreScale {
        self.scale
    }

    /// Decode a JSON document and parse it
    pub fn parse_json(&self, json: &str, recognized_text: &str) -> AssessResult<AssessmentResult> {
        let payload: EnginePayload = serde_json::from_str(json).map_err(|e| {
            AssessError::MalformedResult(format!("Engine payload is not valid JSON: {}", e))
        })?;
        self.parse(&payload, recognized_text)
    }

    /// Parse a decoded payload, stamping the current time
    pub fn parse(
        &self,
        payload: &EnginePayload,
        recognized_text: &str,
    ) -> AssessResult<AssessmentResult> {
        self.parse_at(payload, recognized_text, pron_common::time::now())
    }

    /// Parse a decoded payload with an explicit processing time
    pub fn parse_at(
        &self,
        payload: &EnginePayload,
        recognized_text: &str,
        processed_at: DateTime<Utc>,
    ) -> AssessResult<AssessmentResult> {
        let candidates = payload.nbest.as_deref().ok_or_else(|| {
            AssessError::MalformedResult("Payload has no NBest candidate list".to_string())
        })?;

        let best = candidates.first().ok_or_else(|| {
            AssessError::MalformedResult("NBest candidate list is empty".to_string())
        })?;

        let raw_words = match best.words.as_deref() {
            Some(words) if !words.is_empty() => words,
            Some(_) => {
                return Err(AssessError::MalformedResult(
                    "Best candidate has an empty word list".to_string(),
                ))
            }
            None => {
                return Err(AssessError::MalformedResult(
                    "Best candidate has no word list".to_string(),
                ))
            }
        };

        let words = raw_words
            .iter()
            .enumerate()
            .map(|(index, raw)| self.parse_word(index, raw, processed_at))
            .collect::<AssessResult<Vec<_>>>()?;

        // Summary is independent of the word walk: envelope, then nested, then inline
        let summary = payload
            .summary
            .as_ref()
            .or(best.pronunciation_assessment.as_ref())
            .unwrap_or(&best.inline_scores);
        let (accuracy_score, fluency_score, pronunciation_score) = self.summary_scores(summary);

        debug!(
            status = payload.recognition_status.as_deref().unwrap_or("unknown"),
            candidates = candidates.len(),
            words = words.len(),
            accuracy = accuracy_score,
            "Parsed assessment payload"
        );

        Ok(AssessmentResult {
            assessment_id: Uuid::new_v4(),
            recognized_text: recognized_text.to_string(),
            accuracy_score,
            fluency_score,
            pronunciation_score,
            words,
            assessed_at: processed_at,
        })
    }

    fn parse_word(
        &self,
        index: usize,
        raw: &RawWord,
        processed_at: DateTime<Utc>,
    ) -> AssessResult<WordScore> {
        let word = match raw.word.as_deref() {
            Some(text) if !text.trim().is_empty() => text.to_string(),
            _ => {
                return Err(AssessError::MalformedResult(format!(
                    "Word entry {} has no text",
                    index
                )))
            }
        };

        let nested = raw.pronunciation_assessment.as_ref();
        let inline = &raw.inline_scores;
        let accuracy_score = self.scale.normalize(
            nested
                .and_then(|a| a.accuracy_score)
                .or(inline.accuracy_score),
        );
        let error_type = nested
            .and_then(|a| a.error_type.as_deref())
            .or(inline.error_type.as_deref())
            .map(ErrorType::from_engine_tag)
            .unwrap_or_default();

        let phonemes = raw
            .phonemes
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|p| self.parse_phoneme(p))
            .collect();

        trace!(word = %word, accuracy = accuracy_score, error_type = ?error_type, "Parsed word");

        Ok(WordScore {
            word,
            accuracy_score,
            error_type,
            phonemes,
            timestamp: processed_at,
        })
    }

    fn parse_phoneme(&self, raw: &RawPhoneme) -> PhonemeScore {
        let nested = raw.pronunciation_assessment.as_ref();
        let inline = &raw.inline_scores;

        let confusions = nested
            .and_then(|a| a.nbest_phonemes.as_deref())
            .or(inline.nbest_phonemes.as_deref())
            .unwrap_or_default()
            .iter()
            .filter_map(|c| self.parse_confusion(c))
            .collect();

        PhonemeScore {
            phoneme: raw.phoneme.clone().unwrap_or_default(),
            accuracy_score: self.scale.normalize(
                nested
                    .and_then(|a| a.accuracy_score)
                    .or(inline.accuracy_score),
            ),
            confusions,
        }
    }

    /// A candidate without a symbol cannot be represented and is dropped
    fn parse_confusion(&self, raw: &RawConfusion) -> Option<PhonemeConfusion> {
        let phoneme = raw.phoneme.as_deref().filter(|p| !p.trim().is_empty())?;
        Some(PhonemeConfusion {
            phoneme: phoneme.to_string(),
            score: self.scale.normalize(raw.score),
        })
    }

    fn summary_scores(&self, summary: &RawSummary) -> (f64, f64, f64) {
        (
            self.scale.normalize(summary.accuracy_score),
            self.scale.normalize(summary.fluency_score),
            self.scale.normalize(summary.pron_score),
        )
    }
}

/// Parse with the default (0-100) parser
pub fn parse(payload: &EnginePayload, recognized_text: &str) -> AssessResult<AssessmentResult> {
    ResultParser::default().parse(payload, recognized_text)
}
