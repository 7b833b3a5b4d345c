use std::time::Duration;

use serde::Deserialize;

use crate::detection::domain::face_detector::{DetectedFace, FaceDetector};
use crate::shared::collaborator_error::CollaboratorError;
use crate::shared::constants::IMAGE_FIELD;
use crate::shared::http_transport::MultipartTransport;

const SERVICE: &str = "detection";

#[derive(Deserialize)]
struct DetectionResponse {
    #[serde(default)]
    faces: Vec<DetectedFace>,
}

/// Face detector backed by the remote detection service.
///
/// Wire format: multipart field `image` in, `{"faces": [{"x","y","w","h"}]}` out.
pub struct HttpFaceDetector {
    transport: MultipartTransport,
}

impl HttpFaceDetector {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, CollaboratorError> {
        Ok(Self {
            transport: MultipartTransport::new(SERVICE, endpoint, timeout)?,
        })
    }
}

impl FaceDetector for HttpFaceDetector {
    fn detect(&self, image_bytes: &[u8]) -> Result<Vec<DetectedFace>, CollaboratorError> {
        let response = self.transport.post(
            IMAGE_FIELD,
            "image",
            "application/octet-stream",
            image_bytes,
        )?;
        let body: DetectionResponse = self.transport.read_json(response)?;
        log::debug!(
            "{} reported {} face(s) at {}",
            SERVICE,
            body.faces.len(),
            self.transport.endpoint()
        );
        Ok(body.faces)
    }
}
