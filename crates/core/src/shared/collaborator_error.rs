use std::time::Duration;

use thiserror::Error;

/// Failure classes a caller can be shown, independent of which stage failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing, empty or undecodable input; the client's fault.
    InputError,
    /// A collaborator could not be reached or did not answer in time.
    UpstreamUnavailable,
    /// A collaborator answered with a failure status or an unusable body.
    UpstreamError,
    /// Something that should not fail did.
    InternalError,
}

/// A failed round-trip to one of the remote collaborators.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("{service} unreachable at {endpoint}: {source}")]
    Unavailable {
        service: &'static str,
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} did not respond within {timeout:?}")]
    Timeout {
        service: &'static str,
        timeout: Duration,
    },
    #[error("{service} returned status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("{service} returned an invalid response: {reason}")]
    InvalidResponse {
        service: &'static str,
        reason: String,
    },
    #[error("failed to build {service} client or request: {source}")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl CollaboratorError {
    pub fn service(&self) -> &'static str {
        match self {
            Self::Unavailable { service, .. }
            | Self::Timeout { service, .. }
            | Self::Status { service, .. }
            | Self::InvalidResponse { service, .. }
            | Self::Request { service, .. } => service,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable { .. } | Self::Timeout { .. } => ErrorKind::UpstreamUnavailable,
            Self::Status { .. } | Self::InvalidResponse { .. } => ErrorKind::UpstreamError,
            Self::Request { .. } => ErrorKind::InternalError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_unavailable() {
        let err = CollaboratorError::Timeout {
            service: "detection",
            timeout: Duration::from_secs(10),
        };
        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
        assert_eq!(err.service(), "detection");
    }

    #[test]
    fn test_status_and_invalid_body_are_upstream_errors() {
        let status = CollaboratorError::Status {
            service: "classification",
            status: 500,
            body: "boom".into(),
        };
        let invalid = CollaboratorError::InvalidResponse {
            service: "anonymization",
            reason: "not an image".into(),
        };
        assert_eq!(status.kind(), ErrorKind::UpstreamError);
        assert_eq!(invalid.kind(), ErrorKind::UpstreamError);
    }

    #[test]
    fn test_display_names_service_and_status() {
        let err = CollaboratorError::Status {
            service: "detection",
            status: 502,
            body: "bad gateway".into(),
        };
        let text = err.to_string();
        assert!(text.contains("detection"));
        assert!(text.contains("502"));
        assert!(text.contains("bad gateway"));
    }
}
