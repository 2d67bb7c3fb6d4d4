//! Performance aggregator
//!
//! Folds one [`AssessmentResult`] into a [`LearnerProfile`]:
//!
//! 1. Every phoneme updates its profile entry: attempt count, incremental
//!    mean (`avg += (v - avg) / n`), last accuracy, and the bounded top-K list
//!    of common confusions.
//! 2. Every word scoring below the mispronunciation threshold, or tagged with
//!    a pronunciation error, bumps its trouble word entry.
//! 3. The result is appended to the bounded history.
//!
//! Merging never fails and does not deduplicate: each call is one attempt.
//! Callers serialize merges per learner (see `services::profile_service`).

use chrono::{DateTime, Utc};
use pron_common::config::AssessmentConfig;
use tracing::debug;

use crate::models::profile::word_key;
use crate::models::{
    AssessmentResult, CommonConfusion, LearnerProfile, PhonemeConfusion, PhonemeProfileEntry,
    PhonemeScore, TroubleWord, WordScore,
};

/// Aggregation settings
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorConfig {
    /// Word accuracy strictly below this counts as a mispronunciation
    pub mispronunciation_threshold: f64,
    /// Confusions retained per phoneme
    pub confusion_top_k: usize,
    /// Assessments retained in profile history (0 keeps none)
    pub history_limit: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            mispronunciation_threshold: 60.0,
            confusion_top_k: 5,
            history_limit: 20,
        }
    }
}

impl From<&AssessmentConfig> for AggregatorConfig {
    fn from(config: &AssessmentConfig) -> Self {
        Self {
            mispronunciation_threshold: config.mispronunciation_threshold,
            confusion_top_k: config.confusion_top_k,
            history_limit: config.history_limit,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PerformanceAggregator {
    config: AggregatorConfig,
}

impl PerformanceAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Merge `result` into `profile` and return the updated profile
    pub fn merge(&self, mut profile: LearnerProfile, result: &AssessmentResult) -> LearnerProfile {
        self.merge_at(&mut profile, result, pron_common::time::now());
        profile
    }

    /// Merge in place with an explicit merge time
    pub fn merge_at(
        &self,
        profile: &mut LearnerProfile,
        result: &AssessmentResult,
        now: DateTime<Utc>,
    ) {
        let mut phonemes_merged = 0usize;
        for phoneme in result.phonemes() {
            if self.merge_phoneme(profile, phoneme, now) {
                phonemes_merged += 1;
            }
        }

        let mut trouble_hits = 0usize;
        for word in &result.words {
            if self.merge_word(profile, word, now) {
                trouble_hits += 1;
            }
        }

        if self.config.history_limit > 0 {
            profile.history.push_back(result.clone());
            while profile.history.len() > self.config.history_limit {
                profile.history.pop_front();
            }
        }

        profile.total_assessments += 1;
        profile.updated_at = now;

        debug!(
            learner_id = %profile.learner_id,
            assessment_id = %result.assessment_id,
            phonemes_merged,
            trouble_hits,
            "Merged assessment into learner profile"
        );
    }

    /// Returns false for phonemes without a symbol, which cannot be keyed
    fn merge_phoneme(
        &self,
        profile: &mut LearnerProfile,
        score: &PhonemeScore,
        now: DateTime<Utc>,
    ) -> bool {
        if score.phoneme.trim().is_empty() {
            return false;
        }

        let entry = profile
            .phonemes
            .entry(score.phoneme.clone())
            .or_insert_with(|| PhonemeProfileEntry::new(score.phoneme.clone(), now));

        record_attempt(entry, score.accuracy_score, now);

        for confusion in &score.confusions {
            if is_substitution(&score.phoneme, confusion) {
                fold_confusion(entry, confusion, self.config.confusion_top_k);
            }
        }
        true
    }

    /// Returns true when the word was recorded as trouble
    fn merge_word(
        &self,
        profile: &mut LearnerProfile,
        word: &WordScore,
        now: DateTime<Utc>,
    ) -> bool {
        if !word.is_mispronounced(self.config.mispronunciation_threshold) {
            return false;
        }

        let key = word_key(&word.word);
        let trouble = profile
            .trouble_words
            .entry(key.clone())
            .or_insert_with(|| TroubleWord {
                word: key,
                frequency: 0,
                last_encountered: now,
            });
        trouble.frequency += 1;
        trouble.last_encountered = now;
        true
    }
}

/// Merge with default settings and a custom threshold
pub fn merge(
    profile: LearnerProfile,
    result: &AssessmentResult,
    mispronunciation_threshold: f64,
) -> LearnerProfile {
    PerformanceAggregator::new(AggregatorConfig {
        mispronunciation_threshold,
        ..AggregatorConfig::default()
    })
    .merge(profile, result)
}

fn record_attempt(entry: &mut PhonemeProfileEntry, accuracy: f64, now: DateTime<Utc>) {
    entry.total_attempts += 1;
    entry.average_accuracy += (accuracy - entry.average_accuracy) / f64::from(entry.total_attempts);
    entry.last_accuracy = accuracy;
    entry.last_updated = now;
}

/// The engine lists the target phoneme among its own candidates; that is not a confusion
fn is_substitution(target: &str, confusion: &PhonemeConfusion) -> bool {
    confusion.phoneme != target && confusion.score > 0.0
}

/// Count one sighting, then keep the top-K by frequency, most recent first on ties
fn fold_confusion(entry: &mut PhonemeProfileEntry, confusion: &PhonemeConfusion, top_k: usize) {
    entry.confusion_observations += 1;
    let seen = entry.confusion_observations;

    match entry
        .common_confusions
        .iter_mut()
        .find(|c| c.phoneme == confusion.phoneme)
    {
        Some(existing) => {
            existing.frequency += 1;
            existing.average_score +=
                (confusion.score - existing.average_score) / f64::from(existing.frequency);
            existing.last_seen = seen;
        }
        None => entry.common_confusions.push(CommonConfusion {
            phoneme: confusion.phoneme.clone(),
            frequency: 1,
            average_score: confusion.score,
            last_seen: seen,
        }),
    }

    entry.common_confusions.sort_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| b.last_seen.cmp(&a.last_seen))
    });
    entry.common_confusions.truncate(top_k);
}
