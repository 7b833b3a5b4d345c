use crate::blurring::domain::region_blurrer::RegionBlurrer;
use crate::shared::constants::DEFAULT_FALLBACK_BLUR_KERNEL;
use crate::shared::raster_image::RasterImage;
use crate::shared::region::FaceRegion;

use super::gaussian::{self, GaussianKernel};

/// Blurs a face region on the CPU with a separable Gaussian.
///
/// Large kernels run on a downscaled copy of the crop and are scaled back
/// up, which gives a visually equivalent result at a fraction of the cost.
pub struct GaussianRegionBlurrer {
    kernel: GaussianKernel,
    small_kernel: GaussianKernel,
    scale: usize,
}

impl GaussianRegionBlurrer {
    pub fn new(kernel_size: usize) -> Self {
        let kernel_size = kernel_size.max(1) | 1;
        let scale = (kernel_size / 50).max(1);
        Self {
            kernel: GaussianKernel::new(kernel_size),
            small_kernel: GaussianKernel::new(kernel_size / scale),
            scale,
        }
    }

    fn blur_crop(&self, crop: &mut RasterImage) {
        let (w, h) = (crop.width() as usize, crop.height() as usize);
        if self.scale <= 1 || w < self.scale * 2 || h < self.scale * 2 {
            self.kernel.apply(crop);
            return;
        }
        let mut small = gaussian::downscale(crop, self.scale);
        self.small_kernel.apply(&mut small);
        *crop = gaussian::upscale(&small, crop.width(), crop.height());
    }
}

impl Default for GaussianRegionBlurrer {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_BLUR_KERNEL)
    }
}

impl RegionBlurrer for GaussianRegionBlurrer {
    fn blur(
        &self,
        raster: &mut RasterImage,
        region: &FaceRegion,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut crop = raster.crop(region)?;
        self.blur_crop(&mut crop);
        raster.composite(region, &crop)?;
        Ok(())
    }
}
