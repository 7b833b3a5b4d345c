use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::codec::domain::image_codec::{CodecError, ImageCodec};
use crate::shared::constants::DEFAULT_JPEG_QUALITY;
use crate::shared::raster_image::RasterImage;

/// Largest side, in pixels, a baseline JPEG can describe.
const MAX_JPEG_DIMENSION: u32 = u16::MAX as u32;

/// Decodes anything the `image` crate understands into RGB8 and encodes
/// back to baseline JPEG.
///
/// Alpha and palette data are flattened to RGB at decode time; the pipeline
/// only ever handles three-channel rasters.
pub struct JpegImageCodec {
    quality: u8,
}

impl JpegImageCodec {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegImageCodec {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl ImageCodec for JpegImageCodec {
    fn decode(&self, bytes: &[u8]) -> Result<RasterImage, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::Empty);
        }
        let decoded = image::load_from_memory(bytes).map_err(CodecError::Decode)?;
        let sides = 1..=MAX_JPEG_DIMENSION;
        if !sides.contains(&decoded.width()) || !sides.contains(&decoded.height()) {
            return Err(CodecError::Dimensions {
                width: decoded.width(),
                height: decoded.height(),
                max: MAX_JPEG_DIMENSION,
            });
        }
        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();
        Ok(RasterImage::new(rgb.into_raw(), width, height, 3))
    }

    fn encode(&self, raster: &RasterImage) -> Result<Vec<u8>, CodecError> {
        let layout_error = || CodecError::Layout {
            width: raster.width(),
            height: raster.height(),
            channels: raster.channels(),
        };
        if raster.channels() != 3 {
            return Err(layout_error());
        }
        let rgb = RgbImage::from_raw(raster.width(), raster.height(), raster.data().to_vec())
            .ok_or_else(layout_error)?;

        let mut out = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut out, self.quality)
            .encode_image(&rgb)
            .map_err(CodecError::Encode)?;
        Ok(out.into_inner())
    }

    fn mime_type(&self) -> &'static str {
        "image/jpeg"
    }

    fn extension(&self) -> &'static str {
        "jpg"
    }
}
