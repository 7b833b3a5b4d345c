use crate::shared::collaborator_error::CollaboratorError;
use crate::shared::raster_image::RasterImage;

/// Domain interface for obscuring one face crop.
///
/// Implementations must return a raster with the crop's dimensions; the
/// pipeline verifies this and never composites a mismatched result.
pub trait FaceAnonymizer: Send + Sync {
    fn anonymize(&self, crop_bytes: &[u8]) -> Result<RasterImage, CollaboratorError>;
}
