//! Score model
//!
//! Strict data structures for a single assessment (word / phoneme / confusion
//! hierarchy) and for a learner's longitudinal profile.

pub mod assessment;
pub mod profile;

pub use assessment::{AssessmentResult, ErrorType, PhonemeConfusion, PhonemeScore, WordScore};
pub use profile::{CommonConfusion, LearnerProfile, PhonemeProfileEntry, TroubleWord};

/// Lower bound of the normalized score scale
pub const SCORE_MIN: f64 = 0.0;

/// Upper bound of the normalized score scale
pub const SCORE_MAX: f64 = 100.0;
