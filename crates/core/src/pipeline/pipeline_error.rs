use thiserror::Error;

use crate::codec::domain::image_codec::CodecError;
use crate::pipeline::region_outcome::PipelineStage;
use crate::shared::collaborator_error::{CollaboratorError, ErrorKind};

/// Request-level failures. Per-face failures never appear here.
///
/// | variant           | failed in     | kind                            | status |
/// |-------------------|---------------|---------------------------------|--------|
/// | `NoImage`         | `Received`    | input                           | 400    |
/// | `Decode`          | `Received`    | input                           | 422    |
/// | `DetectionFailed` | `Decoded`     | upstream unavailable / error    | 503    |
/// | `Encode`          | `Composited`  | internal                        | 500    |
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no image supplied")]
    NoImage,
    #[error("invalid input image: {0}")]
    Decode(#[source] CodecError),
    #[error("face detection failed: {0}")]
    DetectionFailed(#[source] CollaboratorError),
    #[error("output image: {0}")]
    Encode(#[source] CodecError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoImage | Self::Decode(_) => ErrorKind::InputError,
            Self::DetectionFailed(e) => match e.kind() {
                ErrorKind::UpstreamUnavailable => ErrorKind::UpstreamUnavailable,
                _ => ErrorKind::UpstreamError,
            },
            Self::Encode(_) => ErrorKind::InternalError,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::NoImage => 400,
            Self::Decode(_) => 422,
            Self::DetectionFailed(_) => 503,
            Self::Encode(_) => 500,
        }
    }

    /// The last state the request reached before failing.
    pub fn failed_stage(&self) -> PipelineStage {
        match self {
            Self::NoImage | Self::Decode(_) => PipelineStage::Received,
            Self::DetectionFailed(_) => PipelineStage::Decoded,
            Self::Encode(_) => PipelineStage::Composited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    fn detection_timeout() -> PipelineError {
        PipelineError::DetectionFailed(CollaboratorError::Timeout {
            service: "detection",
            timeout: Duration::from_secs(10),
        })
    }

    fn detection_status() -> PipelineError {
        PipelineError::DetectionFailed(CollaboratorError::Status {
            service: "detection",
            status: 500,
            body: String::new(),
        })
    }

    #[rstest]
    #[case::no_image(PipelineError::NoImage, 400, ErrorKind::InputError)]
    #[case::undecodable(PipelineError::Decode(CodecError::Empty), 422, ErrorKind::InputError)]
    #[case::detection_timeout(detection_timeout(), 503, ErrorKind::UpstreamUnavailable)]
    #[case::detection_status(detection_status(), 503, ErrorKind::UpstreamError)]
    #[case::encode(
        PipelineError::Encode(CodecError::Layout { width: 1, height: 1, channels: 4 }),
        500,
        ErrorKind::InternalError
    )]
    fn test_status_and_kind(
        #[case] err: PipelineError,
        #[case] status: u16,
        #[case] kind: ErrorKind,
    ) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.kind(), kind);
    }

    #[test]
    fn test_failed_stages() {
        assert_eq!(PipelineError::NoImage.failed_stage(), PipelineStage::Received);
        assert_eq!(detection_timeout().failed_stage(), PipelineStage::Decoded);
    }
}
