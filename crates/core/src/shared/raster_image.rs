use ndarray::{s, ArrayView3, ArrayViewMut3};
use thiserror::Error;

use crate::shared::region::FaceRegion;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RasterError {
    #[error("region {region:?} lies outside the {width}x{height} raster")]
    OutOfBounds {
        region: FaceRegion,
        width: u32,
        height: u32,
    },
    #[error("crop is {actual_width}x{actual_height}, region expects {expected_width}x{expected_height}")]
    SizeMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
    #[error("crop has {actual} channels, raster has {expected}")]
    ChannelMismatch { expected: u8, actual: u8 },
}

/// A decoded image: contiguous interleaved bytes in row-major order.
///
/// One raster belongs to exactly one request. Face regions are replaced in
/// place through [`RasterImage::composite`], so memory stays proportional to
/// one image regardless of how many faces it holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl RasterImage {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Raster data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Raster data length must match dimensions")
    }

    /// Copies the pixels under `region` into a new raster.
    pub fn crop(&self, region: &FaceRegion) -> Result<RasterImage, RasterError> {
        self.check_bounds(region)?;
        let (x, y, w, h) = region_extent(region);
        let view = self.as_ndarray();
        let data: Vec<u8> = view
            .slice(s![y..y + h, x..x + w, ..])
            .iter()
            .copied()
            .collect();
        Ok(RasterImage::new(
            data,
            region.width,
            region.height,
            self.channels,
        ))
    }

    /// Overwrites the pixels under `region` with `crop`.
    ///
    /// The crop must match the region's size and this raster's channel
    /// layout exactly; nothing is written otherwise.
    pub fn composite(&mut self, region: &FaceRegion, crop: &RasterImage) -> Result<(), RasterError> {
        self.check_bounds(region)?;
        if crop.width != region.width || crop.height != region.height {
            return Err(RasterError::SizeMismatch {
                expected_width: region.width,
                expected_height: region.height,
                actual_width: crop.width,
                actual_height: crop.height,
            });
        }
        if crop.channels != self.channels {
            return Err(RasterError::ChannelMismatch {
                expected: self.channels,
                actual: crop.channels,
            });
        }

        let (x, y, w, h) = region_extent(region);
        self.as_ndarray_mut()
            .slice_mut(s![y..y + h, x..x + w, ..])
            .assign(&crop.as_ndarray());
        Ok(())
    }

    fn check_bounds(&self, region: &FaceRegion) -> Result<(), RasterError> {
        if region.fits_within(self.width, self.height) {
            Ok(())
        } else {
            Err(RasterError::OutOfBounds {
                region: *region,
                width: self.width,
                height: self.height,
            })
        }
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

fn region_extent(region: &FaceRegion) -> (usize, usize, usize, usize) {
    (
        region.x as usize,
        region.y as usize,
        region.width as usize,
        region.height as usize,
    )
}
