use serde::Deserialize;

use crate::shared::collaborator_error::CollaboratorError;
use crate::shared::constants::MINOR_SCORE_THRESHOLD;

/// The classification service's answer for one face crop.
///
/// `is_minor` is decided by the service; the pipeline acts on it as-is and
/// never re-derives it from `score`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct ClassificationVerdict {
    #[serde(default)]
    pub is_minor: bool,
    #[serde(default)]
    pub score: f64,
}

impl ClassificationVerdict {
    pub fn new(is_minor: bool, score: f64) -> Self {
        Self { is_minor, score }
    }

    /// Builds a verdict the way the classification service does:
    /// minor when `score > MINOR_SCORE_THRESHOLD`.
    pub fn from_score(score: f64) -> Self {
        Self::new(score > MINOR_SCORE_THRESHOLD, score)
    }

    pub fn has_valid_score(&self) -> bool {
        self.score.is_finite() && (0.0..=1.0).contains(&self.score)
    }
}

/// Domain interface for deciding whether one face crop shows a minor.
pub trait FaceClassifier: Send + Sync {
    fn classify(&self, crop_bytes: &[u8]) -> Result<ClassificationVerdict, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::well_above(0.9, true)]
    #[case::just_above(0.381, true)]
    #[case::at_threshold(0.38, false)]
    #[case::below(0.1, false)]
    fn test_from_score_uses_strict_threshold(#[case] score: f64, #[case] expected: bool) {
        assert_eq!(ClassificationVerdict::from_score(score).is_minor, expected);
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(1.0, true)]
    #[case(1.2, false)]
    #[case(-0.1, false)]
    #[case(f64::NAN, false)]
    fn test_score_range(#[case] score: f64, #[case] valid: bool) {
        assert_eq!(ClassificationVerdict::new(false, score).has_valid_score(), valid);
    }
}
