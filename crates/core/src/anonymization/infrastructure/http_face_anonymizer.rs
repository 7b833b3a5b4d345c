use std::sync::Arc;
use std::time::Duration;

use crate::anonymization::domain::face_anonymizer::FaceAnonymizer;
use crate::codec::domain::image_codec::ImageCodec;
use crate::shared::collaborator_error::CollaboratorError;
use crate::shared::constants::FACE_FIELD;
use crate::shared::http_transport::MultipartTransport;
use crate::shared::raster_image::RasterImage;

const SERVICE: &str = "anonymization";

/// Face anonymizer backed by the remote blurring service.
///
/// Wire format: multipart field `face` (JPEG crop) in, raw image bytes of the
/// transformed crop out. The body is decoded with the pipeline's codec.
pub struct HttpFaceAnonymizer {
    transport: MultipartTransport,
    codec: Arc<dyn ImageCodec>,
}

impl HttpFaceAnonymizer {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        codec: Arc<dyn ImageCodec>,
    ) -> Result<Self, CollaboratorError> {
        Ok(Self {
            transport: MultipartTransport::new(SERVICE, endpoint, timeout)?,
            codec,
        })
    }
}

impl FaceAnonymizer for HttpFaceAnonymizer {
    fn anonymize(&self, crop_bytes: &[u8]) -> Result<RasterImage, CollaboratorError> {
        let file_name = format!("face.{}", self.codec.extension());
        let response =
            self.transport
                .post(FACE_FIELD, &file_name, self.codec.mime_type(), crop_bytes)?;
        let body = self.transport.read_bytes(response)?;
        self.codec
            .decode(&body)
            .map_err(|e| CollaboratorError::InvalidResponse {
                service: SERVICE,
                reason: e.to_string(),
            })
    }
}
