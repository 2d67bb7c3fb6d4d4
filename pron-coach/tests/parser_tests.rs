//! Parser integration tests against detailed engine results
//!
//! `detailed_result.json` nests scores under `PronunciationAssessment` (SDK
//! result); `rest_detailed_result.json` carries them inline (REST result).

use pron_coach::error::AssessError;
use pron_coach::models::ErrorType;
use pron_coach::parser::{ResultParser, ScoreScale};

const FIXTURE: &str = include_str!("fixtures/detailed_result.json");
const REST_FIXTURE: &str = include_str!("fixtures/rest_detailed_result.json");

#[test]
fn test_fixture_words_kept_in_engine_order() {
    let result = ResultParser::default()
        .parse_json(FIXTURE, "The thumb elephant.")
        .unwrap();

    let words: Vec<&str> = result.words.iter().map(|w| w.word.as_str()).collect();
    assert_eq!(words, vec!["the", "thumb", "elephant"]);
    assert_eq!(result.recognized_text, "The thumb elephant.");

    // Summary comes from the candidate when the envelope has none
    assert_eq!(result.accuracy_score, 71.0);
    assert_eq!(result.fluency_score, 88.0);
    assert_eq!(result.pronunciation_score, 76.4);
}

#[test]
fn test_fixture_phonemes_and_confusions() {
    let result = ResultParser::default().parse_json(FIXTURE, "").unwrap();

    let thumb = &result.words[1];
    assert_eq!(thumb.error_type, ErrorType::Mispronunciation);
    assert_eq!(thumb.accuracy_score, 42.0);

    let symbols: Vec<&str> = thumb.phonemes.iter().map(|p| p.phoneme.as_str()).collect();
    assert_eq!(symbols, vec!["θ", "ʌ", "m"]);

    let theta = &thumb.phonemes[0];
    assert_eq!(theta.accuracy_score, 18.0);
    let heard: Vec<(&str, f64)> = theta
        .confusions
        .iter()
        .map(|c| (c.phoneme.as_str(), c.score))
        .collect();
    assert_eq!(heard, vec![("f", 74.0), ("θ", 18.0), ("s", 6.0)]);

    // Phonemes without alternatives carry an empty list
    assert!(thumb.phonemes[1].confusions.is_empty());
    assert_eq!(result.phonemes().count(), 12);
}

#[test]
fn test_every_word_gets_same_timestamp_and_result_gets_id() {
    let a = ResultParser::default().parse_json(FIXTURE, "").unwrap();
    let b = ResultParser::default().parse_json(FIXTURE, "").unwrap();

    assert_ne!(a.assessment_id, b.assessment_id);
    assert!(a.words.iter().all(|w| w.timestamp == a.assessed_at));
}

#[test]
fn test_rest_layout_scores_are_read() {
    let result = ResultParser::default()
        .parse_json(REST_FIXTURE, "Good morning.")
        .unwrap();

    assert_eq!(result.accuracy_score, 100.0);
    assert_eq!(result.fluency_score, 100.0);
    assert_eq!(result.pronunciation_score, 100.0);

    let words: Vec<(&str, f64)> = result
        .words
        .iter()
        .map(|w| (w.word.as_str(), w.accuracy_score))
        .collect();
    assert_eq!(words, vec![("good", 98.0), ("morning", 97.0)]);

    let d = &result.words[0].phonemes[2];
    assert_eq!(d.phoneme, "d");
    assert_eq!(d.accuracy_score, 52.0);
    let heard: Vec<&str> = d.confusions.iter().map(|c| c.phoneme.as_str()).collect();
    assert_eq!(heard, vec!["d", "t"]);
}

#[test]
fn test_unit_scale_engine() {
    let json = r#"{
        "NBest": [{
            "PronunciationAssessment": {
                "AccuracyScore": 0.8, "FluencyScore": 1.4, "PronScore": -0.2
            },
            "Words": [{
                "Word": "ship",
                "PronunciationAssessment": { "AccuracyScore": 0.55 },
                "Phonemes": [{
                    "Phoneme": "ʃ", "PronunciationAssessment": { "AccuracyScore": 0.3 }
                }]
            }]
        }]
    }"#;

    let result = ResultParser::new(ScoreScale::Unit)
        .parse_json(json, "ship")
        .unwrap();

    assert!((result.accuracy_score - 80.0).abs() < 1e-9);
    assert_eq!(result.fluency_score, 100.0);
    assert_eq!(result.pronunciation_score, 0.0);
    assert!((result.words[0].accuracy_score - 55.0).abs() < 1e-9);
    assert!((result.words[0].phonemes[0].accuracy_score - 30.0).abs() < 1e-9);
}

#[test]
fn test_structural_gaps_are_malformed() {
    let parser = ResultParser::default();
    for json in [
        r#"{}"#,
        r#"{"NBest": []}"#,
        r#"{"NBest": [{"Display": "hi"}]}"#,
        r#"{"NBest": [{"Words": []}]}"#,
        r#"{"NBest": [{"Words": [{"PronunciationAssessment": {"AccuracyScore": 50}}]}]}"#,
        r#"not json"#,
    ] {
        let err = parser.parse_json(json, "").unwrap_err();
        assert!(
            matches!(err, AssessError::MalformedResult(_)),
            "expected MalformedResult for {json}, got {err:?}"
        );
    }
}

#[test]
fn test_missing_word_assessment_scores_zero() {
    let json = r#"{"NBest": [{"Words": [{"Word": "cat"}]}]}"#;
    let result = ResultParser::default().parse_json(json, "cat").unwrap();

    assert_eq!(result.words.len(), 1);
    assert_eq!(result.words[0].accuracy_score, 0.0);
    assert_eq!(result.words[0].error_type, ErrorType::None);
    assert!(result.words[0].phonemes.is_empty());
    assert_eq!(result.accuracy_score, 0.0);
}
