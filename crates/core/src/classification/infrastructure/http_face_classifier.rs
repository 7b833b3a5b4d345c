use std::time::Duration;

use crate::classification::domain::face_classifier::{ClassificationVerdict, FaceClassifier};
use crate::shared::collaborator_error::CollaboratorError;
use crate::shared::constants::FACE_FIELD;
use crate::shared::http_transport::MultipartTransport;

const SERVICE: &str = "classification";

/// Age classifier backed by the remote classification service.
///
/// Wire format: multipart field `face` (JPEG crop) in,
/// `{"is_minor": bool, "score": float}` out.
pub struct HttpFaceClassifier {
    transport: MultipartTransport,
}

impl HttpFaceClassifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, CollaboratorError> {
        Ok(Self {
            transport: MultipartTransport::new(SERVICE, endpoint, timeout)?,
        })
    }
}

impl FaceClassifier for HttpFaceClassifier {
    fn classify(&self, crop_bytes: &[u8]) -> Result<ClassificationVerdict, CollaboratorError> {
        let response = self
            .transport
            .post(FACE_FIELD, "face.jpg", "image/jpeg", crop_bytes)?;
        let verdict: ClassificationVerdict = self.transport.read_json(response)?;
        if !verdict.has_valid_score() {
            return Err(CollaboratorError::InvalidResponse {
                service: SERVICE,
                reason: format!("score {} outside [0, 1]", verdict.score),
            });
        }
        Ok(verdict)
    }
}
