//! Score normalization
//!
//! The model stores every score as `f64` on a 0-100 scale. Engines report
//! either 0-100 ("HundredMark") or 0-1; the parser is told which and converts
//! once, here, before anything reaches the score model.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::{SCORE_MAX, SCORE_MIN};

/// Native score scale of a speech engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreScale {
    /// 0-100
    #[default]
    Percent,
    /// 0.0-1.0
    Unit,
}

impl ScoreScale {
    /// Convert an optional engine score to the 0-100 scale
    ///
    /// Missing or non-finite values become 0; out-of-range values are clamped.
    pub fn normalize(self, raw: Option<f64>) -> f64 {
        let Some(value) = raw.filter(|v| v.is_finite()) else {
            return SCORE_MIN;
        };

        let scaled = match self {
            ScoreScale::Percent => value,
            ScoreScale::Unit => value * 100.0,
        };

        if !(SCORE_MIN..=SCORE_MAX).contains(&scaled) {
            tracing::trace!(raw = value, scale = ?self, "Clamping out-of-range engine score");
        }
        scaled.clamp(SCORE_MIN, SCORE_MAX)
    }
}

impl FromStr for ScoreScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percent" | "hundred_mark" | "hundredmark" => Ok(ScoreScale::Percent),
            "unit" => Ok(ScoreScale::Unit),
            _ => Err(format!(
                "Unknown score scale '{}': expected 'percent' or 'unit'",
                s
            )),
        }
    }
}
