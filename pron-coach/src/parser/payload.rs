//! Typed schema of the engine's detailed recognition result
//!
//! Field names follow the engine's PascalCase JSON. Two layouts are accepted:
//! the SDK result nests scores under `PronunciationAssessment` objects, while
//! the short-audio REST result puts `AccuracyScore`, `ErrorType`, ... directly
//! on the candidate, word and phoneme. The inline fields are captured through
//! `#[serde(flatten)]` and the parser prefers nested values when both exist.
//!
//! Every field the engine may omit is an `Option`. Scores go through
//! [`lenient_f64`] and nested objects and lists through [`lenient`], so a
//! null or wrongly typed value becomes `None` instead of a decode failure.
//! Only fields the parser reads are declared; the rest are ignored.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Top-level detailed result
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnginePayload {
    /// "Success", "NoMatch", "InitialSilenceTimeout", ...
    #[serde(default, deserialize_with = "lenient_string")]
    pub recognition_status: Option<String>,

    /// Engine transcription with casing and punctuation
    #[serde(default, deserialize_with = "lenient_string")]
    pub display_text: Option<String>,

    /// Ranked recognition candidates, best first
    #[serde(rename = "NBest", default, deserialize_with = "lenient")]
    pub nbest: Option<Vec<RawCandidate>>,

    /// Summary scores, when the envelope carries them at the top level
    #[serde(rename = "PronunciationAssessment", default, deserialize_with = "lenient")]
    pub summary: Option<RawSummary>,
}

impl EnginePayload {
    /// `DisplayText`, falling back to the best candidate's `Display`
    pub fn transcription(&self) -> Option<String> {
        self.display_text.clone().or_else(|| {
            self.nbest
                .as_ref()
                .and_then(|candidates| candidates.first())
                .and_then(|candidate| candidate.display.clone())
        })
    }
}

/// One recognition candidate
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawCandidate {
    #[serde(default, deserialize_with = "lenient_string")]
    pub display: Option<String>,

    /// Summary scores nested SDK-style
    #[serde(default, deserialize_with = "lenient")]
    pub pronunciation_assessment: Option<RawSummary>,

    /// Summary scores placed directly on the candidate (REST layout)
    #[serde(flatten)]
    pub inline_scores: RawSummary,

    #[serde(default, deserialize_with = "lenient")]
    pub words: Option<Vec<RawWord>>,
}

/// Whole-utterance scores
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawSummary {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub accuracy_score: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub fluency_score: Option<f64>,

    #[serde(default, alias = "PronunciationScore", deserialize_with = "lenient_f64")]
    pub pron_score: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawWord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub word: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub pronunciation_assessment: Option<RawWordAssessment>,

    /// REST layout
    #[serde(flatten)]
    pub inline_scores: RawWordAssessment,

    #[serde(default, deserialize_with = "lenient")]
    pub phonemes: Option<Vec<RawPhoneme>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawWordAssessment {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub accuracy_score: Option<f64>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub error_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawPhoneme {
    #[serde(default, deserialize_with = "lenient_string")]
    pub phoneme: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub pronunciation_assessment: Option<RawPhonemeAssessment>,

    /// REST layout
    #[serde(flatten)]
    pub inline_scores: RawPhonemeAssessment,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawPhonemeAssessment {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub accuracy_score: Option<f64>,

    #[serde(rename = "NBestPhonemes", default, deserialize_with = "lenient")]
    pub nbest_phonemes: Option<Vec<RawConfusion>>,
}

/// Alternative phoneme candidate
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawConfusion {
    #[serde(default, deserialize_with = "lenient_string")]
    pub phoneme: Option<String>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub score: Option<f64>,
}

/// Decode an optional nested object or list; a value of the wrong shape is treated as absent
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Accept numbers and numeric strings; anything else is treated as absent
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|f| f.is_finite()))
}

/// Accept strings only; other JSON types are treated as absent
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}
