use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;

use crate::shared::collaborator_error::CollaboratorError;

/// Upper bound on how much of an error body is kept for diagnostics.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Blocking multipart POST to a single collaborator endpoint.
///
/// Every call is bounded by the timeout given at construction. There are no
/// retries: a timed-out or refused call is reported once and left to the
/// caller's failure policy.
pub struct MultipartTransport {
    client: Client,
    service: &'static str,
    endpoint: String,
    timeout: Duration,
}

impl MultipartTransport {
    pub fn new(
        service: &'static str,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| CollaboratorError::Request { service, source })?;
        Ok(Self {
            client,
            service,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends `bytes` as the single file part `field` and returns the
    /// response once it is known to carry a success status.
    pub fn post(
        &self,
        field: &'static str,
        file_name: &str,
        mime: &str,
        bytes: &[u8],
    ) -> Result<Response, CollaboratorError> {
        let part = Part::bytes(bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(|source| CollaboratorError::Request {
                service: self.service,
                source,
            })?;
        let form = Form::new().part(field, part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CollaboratorError::Status {
                service: self.service,
                status: status.as_u16(),
                body: truncate(&body),
            });
        }
        Ok(response)
    }

    pub fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T, CollaboratorError> {
        let bytes = self.read_bytes(response)?;
        serde_json::from_slice(&bytes).map_err(|e| CollaboratorError::InvalidResponse {
            service: self.service,
            reason: e.to_string(),
        })
    }

    pub fn read_bytes(&self, response: Response) -> Result<Vec<u8>, CollaboratorError> {
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| self.map_body_error(e))
    }

    fn map_send_error(&self, error: reqwest::Error) -> CollaboratorError {
        if error.is_timeout() {
            CollaboratorError::Timeout {
                service: self.service,
                timeout: self.timeout,
            }
        } else if error.is_builder() {
            CollaboratorError::Request {
                service: self.service,
                source: error,
            }
        } else {
            CollaboratorError::Unavailable {
                service: self.service,
                endpoint: self.endpoint.clone(),
                source: error,
            }
        }
    }

    fn map_body_error(&self, error: reqwest::Error) -> CollaboratorError {
        if error.is_timeout() {
            CollaboratorError::Timeout {
                service: self.service,
                timeout: self.timeout,
            }
        } else {
            CollaboratorError::InvalidResponse {
                service: self.service,
                reason: error.to_string(),
            }
        }
    }
}

fn truncate(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        body.to_string()
    } else {
        let mut short: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        short.push('…');
        short
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::collaborator_error::ErrorKind;
    use crate::test_support::{closed_port_url, serve_once, FakeResponse};

    fn transport(url: &str, timeout: Duration) -> MultipartTransport {
        MultipartTransport::new("detection", url, timeout).unwrap()
    }

    #[test]
    fn test_post_sends_named_multipart_field() {
        let server = serve_once(FakeResponse::json(r#"{"ok":true}"#));
        let t = transport(&server.url, Duration::from_secs(5));

        let response = t
            .post("image", "upload.jpg", "image/jpeg", b"raw-image-bytes")
            .unwrap();
        let body: serde_json::Value = t.read_json(response).unwrap();
        assert_eq!(body["ok"], true);

        let request = server.request();
        assert!(request.starts_with("POST "));
        assert!(request.contains("multipart/form-data"));
        assert!(request.contains(r#"name="image""#));
        assert!(request.contains("raw-image-bytes"));
    }

    #[test]
    fn test_non_success_status_is_reported_with_body() {
        let server = serve_once(FakeResponse::status(500, "model crashed"));
        let t = transport(&server.url, Duration::from_secs(5));

        let err = t.post("image", "a.jpg", "image/jpeg", b"x").unwrap_err();
        match err {
            CollaboratorError::Status { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body, "model crashed");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn test_refused_connection_is_unavailable() {
        let t = transport(&closed_port_url(), Duration::from_secs(2));
        let err = t.post("image", "a.jpg", "image/jpeg", b"x").unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable { .. }));
        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
    }

    #[test]
    fn test_slow_collaborator_times_out() {
        let server = serve_once(FakeResponse::json("{}").delayed(Duration::from_millis(1500)));
        let t = transport(&server.url, Duration::from_millis(200));
        let err = t.post("image", "a.jpg", "image/jpeg", b"x").unwrap_err();
        assert!(matches!(err, CollaboratorError::Timeout { .. }), "{err:?}");
    }

    #[test]
    fn test_malformed_json_is_invalid_response() {
        let server = serve_once(FakeResponse::json("not json"));
        let t = transport(&server.url, Duration::from_secs(5));
        let response = t.post("image", "a.jpg", "image/jpeg", b"x").unwrap();
        let err = t.read_json::<serde_json::Value>(response).unwrap_err();
        assert!(matches!(err, CollaboratorError::InvalidResponse { .. }));
    }

    #[test]
    fn test_truncate_long_bodies() {
        let long = "e".repeat(MAX_ERROR_BODY_CHARS + 10);
        let short = truncate(&long);
        assert_eq!(short.chars().count(), MAX_ERROR_BODY_CHARS + 1);
        assert!(short.ends_with('…'));
        assert_eq!(truncate("short"), "short");
    }
}
