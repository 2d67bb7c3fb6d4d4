//! One pronunciation attempt as scored by the speech engine
//!
//! All scores are on the normalized 0-100 scale. Values are produced by the
//! result parser, which owns defaulting and clamping; nothing here re-checks
//! ranges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scored assessment of one recording against its reference text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    /// Identifier assigned when the result was parsed
    pub assessment_id: Uuid,
    /// Transcription exactly as returned by the engine
    pub recognized_text: String,
    pub accuracy_score: f64,
    pub fluency_score: f64,
    pub pronunciation_score: f64,
    /// Words in engine order
    pub words: Vec<WordScore>,
    /// Processing time
    pub assessed_at: DateTime<Utc>,
}

impl AssessmentResult {
    /// Iterate every phoneme of every word, in pronunciation order
    pub fn phonemes(&self) -> impl Iterator<Item = &PhonemeScore> {
        self.words.iter().flat_map(|w| w.phonemes.iter())
    }

    /// Words flagged by the engine or scoring below `threshold`
    pub fn mispronounced_words(&self, threshold: f64) -> impl Iterator<Item = &WordScore> {
        self.words
            .iter()
            .filter(move |w| w.is_mispronounced(threshold))
    }
}

/// Score for one word of the reference text (or an inserted word)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordScore {
    pub word: String,
    pub accuracy_score: f64,
    pub error_type: ErrorType,
    /// Phonemes in left-to-right pronunciation order
    pub phonemes: Vec<PhonemeScore>,
    pub timestamp: DateTime<Utc>,
}

impl WordScore {
    /// Whether this attempt counts against the word
    pub fn is_mispronounced(&self, threshold: f64) -> bool {
        self.accuracy_score < threshold || self.error_type.is_pronunciation_error()
    }
}

/// Score for one phoneme within a word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhonemeScore {
    /// Symbol in the configured phoneme alphabet; empty if the engine omitted it
    pub phoneme: String,
    pub accuracy_score: f64,
    /// Alternative phonemes the engine heard, best first; empty when none
    pub confusions: Vec<PhonemeConfusion>,
}

/// A phoneme the engine considers a likely substitute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhonemeConfusion {
    pub phoneme: String,
    pub score: f64,
}

/// Word-level error tag reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    #[default]
    None,
    Omission,
    Insertion,
    Mispronunciation,
    /// Prosody: pause inside a phrase
    UnexpectedBreak,
    /// Prosody: no pause at a punctuation boundary
    MissingBreak,
    /// Prosody: flat intonation
    Monotone,
    /// Tag not recognized by this parser
    Unknown,
}

impl ErrorType {
    /// Map the engine's tag; blank means no error, unrecognized tags map to `Unknown`
    pub fn from_engine_tag(tag: &str) -> Self {
        let tag = tag.trim();
        if tag.is_empty() {
            return ErrorType::None;
        }
        match tag.to_ascii_lowercase().as_str() {
            "none" => ErrorType::None,
            "omission" => ErrorType::Omission,
            "insertion" => ErrorType::Insertion,
            "mispronunciation" => ErrorType::Mispronunciation,
            "unexpectedbreak" | "unexpected_break" => ErrorType::UnexpectedBreak,
            "missingbreak" | "missing_break" => ErrorType::MissingBreak,
            "monotone" => ErrorType::Monotone,
            _ => ErrorType::Unknown,
        }
    }

    /// True for tags that mean the word itself was said wrong (or not at all)
    ///
    /// Prosody tags describe phrasing rather than the word and return false.
    pub fn is_pronunciation_error(&self) -> bool {
        matches!(
            self,
            ErrorType::Omission
                | ErrorType::Insertion
                | ErrorType::Mispronunciation
                | ErrorType::Unknown
        )
    }
}
