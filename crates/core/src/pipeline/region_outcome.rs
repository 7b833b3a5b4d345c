use std::fmt;

use crate::detection::domain::face_detector::DetectedFace;
use crate::shared::region::FaceRegion;

/// Request-level states, in the order a successful request passes them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    Received,
    Decoded,
    FacesDetected,
    Composited,
    Encoded,
}

/// Per-face states, in the order a minor's face passes them.
///
/// A face that is not a minor stops at `Classified`; a failed step leaves the
/// face at the last state it reached unless it is redacted anyway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FaceStage {
    Cropped,
    Classified,
    Anonymized,
    Composited,
}

/// Which per-face step went wrong.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionFailure {
    /// The crop could not be encoded for transport.
    CropEncoding,
    Classification,
    Anonymization,
    /// The anonymizer answered with a crop of the wrong size.
    DimensionMismatch,
}

impl fmt::Display for RegionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CropEncoding => "crop_encoding",
            Self::Classification => "classification",
            Self::Anonymization => "anonymization",
            Self::DimensionMismatch => "dimension_mismatch",
        };
        f.write_str(name)
    }
}

/// Terminal state of one detected face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionOutcome {
    /// Replaced by the anonymization service's crop.
    Anonymized,
    /// Classified as not a minor; left as is.
    NotMinor,
    /// A step failed and the face was left unmodified (fail-open).
    Unmodified(RegionFailure),
    /// A step failed and the face was redacted anyway (fail-closed): by the
    /// anonymization service after a failed classification, or by the local
    /// blur.
    Redacted(RegionFailure),
    /// The detector's box had no area inside the image.
    Rejected,
}

impl RegionOutcome {
    pub fn is_modified(&self) -> bool {
        matches!(self, Self::Anonymized | Self::Redacted(_))
    }

    pub fn failure(&self) -> Option<RegionFailure> {
        match self {
            Self::Unmodified(f) | Self::Redacted(f) => Some(*f),
            _ => None,
        }
    }
}

/// What happened to one detector box, in detector order.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionReport {
    pub detected: DetectedFace,
    /// `None` when the box was rejected.
    pub region: Option<FaceRegion>,
    pub outcome: RegionOutcome,
    /// Last per-face state reached. `None` when the box was rejected.
    pub stage: Option<FaceStage>,
}
