//! Learner profile: longitudinal per-phoneme and per-word statistics
//!
//! The profile is the aggregate root persisted by a [`crate::store::ProfileStore`].
//! It is only mutated through [`crate::aggregator::PerformanceAggregator`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use super::assessment::AssessmentResult;

/// Everything known about one learner's pronunciation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub learner_id: String,
    /// Keyed by phoneme symbol
    pub phonemes: BTreeMap<String, PhonemeProfileEntry>,
    /// Keyed by lowercase word
    pub trouble_words: BTreeMap<String, TroubleWord>,
    /// Most recent assessments, oldest first
    #[serde(default)]
    pub history: VecDeque<AssessmentResult>,
    /// Number of assessments ever merged (history may hold fewer)
    #[serde(default)]
    pub total_assessments: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LearnerProfile {
    /// Empty profile for a learner's first attempt
    pub fn new(learner_id: impl Into<String>) -> Self {
        let now = pron_common::time::now();
        Self {
            learner_id: learner_id.into(),
            phonemes: BTreeMap::new(),
            trouble_words: BTreeMap::new(),
            history: VecDeque::new(),
            total_assessments: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn phoneme(&self, phoneme: &str) -> Option<&PhonemeProfileEntry> {
        self.phonemes.get(phoneme)
    }

    /// Case-insensitive trouble word lookup
    pub fn trouble_word(&self, word: &str) -> Option<&TroubleWord> {
        self.trouble_words.get(&word_key(word))
    }

    /// Phonemes with the lowest average accuracy, worst first
    ///
    /// Entries with fewer than `min_attempts` attempts are ignored so a single
    /// bad attempt does not dominate practice selection.
    pub fn weakest_phonemes(&self, limit: usize, min_attempts: u32) -> Vec<&PhonemeProfileEntry> {
        let mut entries: Vec<&PhonemeProfileEntry> = self
            .phonemes
            .values()
            .filter(|e| e.total_attempts >= min_attempts)
            .collect();
        entries.sort_by(|a, b| {
            a.average_accuracy
                .total_cmp(&b.average_accuracy)
                .then_with(|| b.total_attempts.cmp(&a.total_attempts))
        });
        entries.truncate(limit);
        entries
    }

    /// Most frequently missed words, most recent first on ties
    pub fn top_trouble_words(&self, limit: usize) -> Vec<&TroubleWord> {
        let mut words: Vec<&TroubleWord> = self.trouble_words.values().collect();
        words.sort_by(|a, b| {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| b.last_encountered.cmp(&a.last_encountered))
        });
        words.truncate(limit);
        words
    }
}

/// Running statistics for one phoneme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhonemeProfileEntry {
    pub phoneme: String,
    pub total_attempts: u32,
    /// Arithmetic mean of every accuracy folded in
    pub average_accuracy: f64,
    pub last_accuracy: f64,
    pub last_updated: DateTime<Utc>,
    /// Ranked by frequency, then recency; bounded by the aggregator's top-K
    pub common_confusions: Vec<CommonConfusion>,
    /// Count of confusion observations; source of `CommonConfusion::last_seen`
    #[serde(default)]
    pub confusion_observations: u64,
}

impl PhonemeProfileEntry {
    pub fn new(phoneme: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            phoneme: phoneme.into(),
            total_attempts: 0,
            average_accuracy: 0.0,
            last_accuracy: 0.0,
            last_updated: now,
            common_confusions: Vec::new(),
            confusion_observations: 0,
        }
    }
}

/// A recurring substitution heard in place of the target phoneme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonConfusion {
    pub phoneme: String,
    pub frequency: u32,
    /// Mean engine score across observations
    pub average_score: f64,
    /// Observation sequence number of the latest sighting
    pub last_seen: u64,
}

/// A word the learner keeps getting wrong
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TroubleWord {
    /// Lowercase form, identical to the map key
    pub word: String,
    pub frequency: u32,
    pub last_encountered: DateTime<Utc>,
}

/// Normalized trouble word key
pub fn word_key(word: &str) -> String {
    word.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(phoneme: &str, attempts: u32, average: f64) -> PhonemeProfileEntry {
        PhonemeProfileEntry {
            total_attempts: attempts,
            average_accuracy: average,
            last_accuracy: average,
            ..PhonemeProfileEntry::new(phoneme, Utc::now())
        }
    }

    #[test]
    fn test_new_profile_is_empty() {
        let profile = LearnerProfile::new("learner-1");
        assert_eq!(profile.learner_id, "learner-1");
        assert!(profile.phonemes.is_empty());
        assert!(profile.trouble_words.is_empty());
        assert_eq!(profile.total_assessments, 0);
    }

    #[test]
    fn test_word_key_is_case_insensitive() {
        assert_eq!(word_key("  Elephant "), "elephant");
        assert_eq!(word_key("ÉCOLE"), "école");
    }

    #[test]
    fn test_weakest_phonemes_orders_and_filters() {
        let mut profile = LearnerProfile::new("l");
        profile.phonemes.insert("θ".into(), entry("θ", 4, 55.0));
        profile.phonemes.insert("r".into(), entry("r", 10, 40.0));
        profile.phonemes.insert("æ".into(), entry("æ", 1, 10.0));
        profile.phonemes.insert("s".into(), entry("s", 6, 90.0));

        let weakest = profile.weakest_phonemes(2, 2);
        let symbols: Vec<&str> = weakest.iter().map(|e| e.phoneme.as_str()).collect();
        assert_eq!(symbols, vec!["r", "θ"]);
    }

    #[test]
    fn test_top_trouble_words_ties_break_on_recency() {
        let now = Utc::now();
        let mut profile = LearnerProfile::new("l");
        for (word, freq, age) in [("three", 2, 5), ("thumb", 2, 1), ("rural", 4, 10)] {
            profile.trouble_words.insert(
                word.to_string(),
                TroubleWord {
                    word: word.to_string(),
                    frequency: freq,
                    last_encountered: now - Duration::minutes(age),
                },
            );
        }

        let top: Vec<&str> = profile
            .top_trouble_words(3)
            .iter()
            .map(|w| w.word.as_str())
            .collect();
        assert_eq!(top, vec!["rural", "thumb", "three"]);
        assert!(profile.trouble_word("THUMB").is_some());
    }
}
