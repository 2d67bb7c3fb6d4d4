//! Speech engine boundary
//!
//! The recognition engine is an external collaborator. It receives audio plus
//! a [`RecognitionConfig`] and either returns a detailed result payload or
//! reports that it canceled the request. Implementations translate their own
//! envelope into [`EngineOutcome`]; everything downstream is engine-agnostic.

pub mod azure_speech;

pub use azure_speech::AzureSpeechClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AssessResult;

/// Scoring detail level requested from the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    #[default]
    Phoneme,
    Word,
    FullText,
}

impl Granularity {
    /// Name used in the engine's assessment configuration
    pub fn engine_name(&self) -> &'static str {
        match self {
            Granularity::Phoneme => "Phoneme",
            Granularity::Word => "Word",
            Granularity::FullText => "FullText",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.engine_name())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "phoneme" => Ok(Granularity::Phoneme),
            "word" => Ok(Granularity::Word),
            "fulltext" => Ok(Granularity::FullText),
            _ => Err(format!("Invalid grading level: {}", s)),
        }
    }
}

/// Phonetic alphabet for phoneme symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PhonemeAlphabet {
    #[default]
    #[serde(rename = "IPA")]
    Ipa,
    #[serde(rename = "SAPI")]
    Sapi,
}

impl PhonemeAlphabet {
    pub fn engine_name(&self) -> &'static str {
        match self {
            PhonemeAlphabet::Ipa => "IPA",
            PhonemeAlphabet::Sapi => "SAPI",
        }
    }
}

impl FromStr for PhonemeAlphabet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IPA" => Ok(PhonemeAlphabet::Ipa),
            "SAPI" => Ok(PhonemeAlphabet::Sapi),
            _ => Err(format!("Unknown phoneme alphabet '{}': expected IPA or SAPI", s)),
        }
    }
}

/// Everything the engine needs to score one recording
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionConfig {
    pub reference_text: String,
    pub granularity: Granularity,
    pub language: String,
    pub phoneme_alphabet: PhonemeAlphabet,
    /// Alternative phonemes reported per phoneme
    pub nbest_phoneme_count: u8,
    /// Report omissions and insertions against the reference text
    pub enable_miscue: bool,
    pub enable_prosody: bool,
}

/// Successful recognition
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecognition {
    /// Transcription as the engine reported it
    pub recognized_text: String,
    /// Detailed result JSON, handed to the parser untouched
    pub payload: String,
}

/// Terminal state of one engine call
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutcome {
    Recognized(RawRecognition),
    Canceled {
        reason: String,
        error_code: Option<String>,
        details: String,
    },
}

/// Speech assessment engine
///
/// Implementations must not retry; retry policy belongs to the caller.
/// Transport failures are reported as `EngineOutcome::Canceled`.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &'static str;

    /// Run one recognition + assessment call
    async fn recognize(
        &self,
        audio: &[u8],
        config: &RecognitionConfig,
    ) -> AssessResult<EngineOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granularity_from_str() {
        assert_eq!("phoneme".parse::<Granularity>(), Ok(Granularity::Phoneme));
        assert_eq!("Word".parse::<Granularity>(), Ok(Granularity::Word));
        assert_eq!("FullText".parse::<Granularity>(), Ok(Granularity::FullText));
        assert_eq!("full-text".parse::<Granularity>(), Ok(Granularity::FullText));
        assert!("syllable".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_alphabet_from_str() {
        assert_eq!("ipa".parse::<PhonemeAlphabet>(), Ok(PhonemeAlphabet::Ipa));
        assert_eq!("SAPI".parse::<PhonemeAlphabet>(), Ok(PhonemeAlphabet::Sapi));
        assert!("arpabet".parse::<PhonemeAlphabet>().is_err());
    }
}
