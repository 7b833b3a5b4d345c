use serde::Deserialize;

use crate::shared::collaborator_error::CollaboratorError;

/// A face box exactly as the detection service reported it.
///
/// Coordinates are signed and unchecked; they only become a
/// [`FaceRegion`](crate::shared::region::FaceRegion) after clamping against
/// the decoded raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct DetectedFace {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

/// Domain interface for locating faces in a whole image.
///
/// Receives the original, undecoded upload: the service decodes on its own
/// and reports coordinates in the pixel space of that decode. An empty list
/// means no faces, not a failure.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, image_bytes: &[u8]) -> Result<Vec<DetectedFace>, CollaboratorError>;
}
