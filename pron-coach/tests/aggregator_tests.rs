//! Aggregation behaviour across several assessments

use chrono::Utc;
use pron_coach::aggregator::{AggregatorConfig, PerformanceAggregator};
use pron_coach::models::{
    AssessmentResult, ErrorType, LearnerProfile, PhonemeConfusion, PhonemeScore, WordScore,
};
use pron_coach::parser::ResultParser;
use uuid::Uuid;

const FIXTURE: &str = include_str!("fixtures/detailed_result.json");
const REST_FIXTURE: &str = include_str!("fixtures/rest_detailed_result.json");

fn single_word(word: &str, accuracy: f64, phonemes: Vec<PhonemeScore>) -> AssessmentResult {
    AssessmentResult {
        assessment_id: Uuid::new_v4(),
        recognized_text: word.to_string(),
        accuracy_score: accuracy,
        fluency_score: 100.0,
        pronunciation_score: accuracy,
        words: vec![WordScore {
            word: word.to_string(),
            accuracy_score: accuracy,
            error_type: ErrorType::None,
            phonemes,
            timestamp: Utc::now(),
        }],
        assessed_at: Utc::now(),
    }
}

fn theta_heard_as(substitute: &str) -> AssessmentResult {
    single_word(
        "think",
        50.0,
        vec![PhonemeScore {
            phoneme: "θ".to_string(),
            accuracy_score: 50.0,
            confusions: vec![PhonemeConfusion {
                phoneme: substitute.to_string(),
                score: 40.0,
            }],
        }],
    )
}

#[test]
fn test_elephant_counts_only_bad_attempts() {
    let aggregator = PerformanceAggregator::default();
    let mut profile = LearnerProfile::new("ana");

    for accuracy in [40.0, 90.0, 30.0] {
        profile = aggregator.merge(profile, &single_word("elephant", accuracy, Vec::new()));
    }

    let trouble = profile.trouble_word("elephant").unwrap();
    assert_eq!(trouble.frequency, 2);
    assert_eq!(profile.total_assessments, 3);
}

#[test]
fn test_confusion_list_keeps_most_frequent() {
    let aggregator = PerformanceAggregator::new(AggregatorConfig {
        confusion_top_k: 3,
        ..AggregatorConfig::default()
    });
    let mut profile = LearnerProfile::new("ana");

    for (substitute, times) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
        for _ in 0..times {
            profile = aggregator.merge(profile, &theta_heard_as(substitute));
        }
    }

    let entry = profile.phoneme("θ").unwrap();
    let kept: Vec<(&str, u32)> = entry
        .common_confusions
        .iter()
        .map(|c| (c.phoneme.as_str(), c.frequency))
        .collect();
    assert_eq!(kept, vec![("d", 4), ("c", 3), ("b", 2)]);
    assert_eq!(entry.total_attempts, 10);
}

#[test]
fn test_confusion_tie_goes_to_most_recent() {
    let aggregator = PerformanceAggregator::new(AggregatorConfig {
        confusion_top_k: 1,
        ..AggregatorConfig::default()
    });
    let mut profile = LearnerProfile::new("ana");

    profile = aggregator.merge(profile, &theta_heard_as("f"));
    profile = aggregator.merge(profile, &theta_heard_as("t"));

    let entry = profile.phoneme("θ").unwrap();
    assert_eq!(entry.common_confusions.len(), 1);
    assert_eq!(entry.common_confusions[0].phoneme, "t");
}

#[test]
fn test_fixture_merge_builds_profile() {
    let result = ResultParser::default().parse_json(FIXTURE, "").unwrap();
    let profile = PerformanceAggregator::default().merge(LearnerProfile::new("ana"), &result);

    // "ə" appears three times across two words
    let schwa = profile.phoneme("ə").unwrap();
    assert_eq!(schwa.total_attempts, 3);
    assert!((schwa.average_accuracy - (97.0 + 40.0 + 35.0) / 3.0).abs() < 1e-9);
    assert_eq!(schwa.last_accuracy, 35.0);

    // The target itself is not a confusion
    let theta = profile.phoneme("θ").unwrap();
    let heard: Vec<&str> = theta
        .common_confusions
        .iter()
        .map(|c| c.phoneme.as_str())
        .collect();
    assert!(heard.contains(&"f"));
    assert!(heard.contains(&"s"));
    assert!(!heard.contains(&"θ"));

    // "thumb" is tagged, "elephant" is below threshold, "the" is fine
    assert!(profile.trouble_word("thumb").is_some());
    assert!(profile.trouble_word("elephant").is_some());
    assert!(profile.trouble_word("the").is_none());

    assert_eq!(profile.history.len(), 1);
    assert_eq!(profile.history[0].assessment_id, result.assessment_id);
}

#[test]
fn test_history_is_bounded() {
    let aggregator = PerformanceAggregator::new(AggregatorConfig {
        history_limit: 2,
        ..AggregatorConfig::default()
    });
    let results: Vec<AssessmentResult> = (0..3)
        .map(|i| single_word("ship", 70.0 + f64::from(i), Vec::new()))
        .collect();

    let mut profile = LearnerProfile::new("ana");
    for result in &results {
        profile = aggregator.merge(profile, result);
    }

    let ids: Vec<Uuid> = profile.history.iter().map(|r| r.assessment_id).collect();
    assert_eq!(ids, vec![results[1].assessment_id, results[2].assessment_id]);
    assert_eq!(profile.total_assessments, 3);
}

#[test]
fn test_rest_layout_good_attempt_is_not_trouble() {
    let result = ResultParser::default()
        .parse_json(REST_FIXTURE, "Good morning.")
        .unwrap();
    let profile = PerformanceAggregator::default().merge(LearnerProfile::new("ana"), &result);

    assert!(profile.trouble_words.is_empty());
    assert_eq!(profile.phoneme("g").unwrap().average_accuracy, 99.0);
    let d = profile.phoneme("d").unwrap();
    assert_eq!(d.common_confusions.len(), 1);
    assert_eq!(d.common_confusions[0].phoneme, "t");
}
