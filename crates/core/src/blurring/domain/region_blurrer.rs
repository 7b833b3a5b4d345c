use crate::shared::raster_image::RasterImage;
use crate::shared::region::FaceRegion;

/// Domain interface for obscuring a region locally, without a collaborator.
///
/// Modifies the raster in place; pixels outside `region` are never touched.
pub trait RegionBlurrer: Send + Sync {
    fn blur(&self, raster: &mut RasterImage, region: &FaceRegion) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
