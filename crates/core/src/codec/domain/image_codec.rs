use thiserror::Error;

use crate::shared::raster_image::RasterImage;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("image data is empty")]
    Empty,
    #[error("could not decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("could not encode image: {0}")]
    Encode(#[source] image::ImageError),
    /// Decodable, but too large (or degenerate) for the output format.
    #[error("image is {width}x{height}; each side must be between 1 and {max} pixels")]
    Dimensions { width: u32, height: u32, max: u32 },
    #[error("raster layout {width}x{height}x{channels} cannot be encoded")]
    Layout {
        width: u32,
        height: u32,
        channels: u8,
    },
}

/// Converts between compressed image bytes and in-memory rasters.
///
/// Decoding accepts any supported container; encoding always produces the
/// same single output format, whatever the input was.
pub trait ImageCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<RasterImage, CodecError>;

    fn encode(&self, image: &RasterImage) -> Result<Vec<u8>, CodecError>;

    /// MIME type of everything [`ImageCodec::encode`] produces.
    fn mime_type(&self) -> &'static str;

    /// File extension matching [`ImageCodec::mime_type`], without the dot.
    fn extension(&self) -> &'static str;
}
