use std::sync::Arc;
use std::time::Duration;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use minor_shield_core::pipeline::anonymize_minors_use_case::{AnonymizeMinorsUseCase, PipelineOutput};
use minor_shield_core::pipeline::pipeline_error::PipelineError;
use minor_shield_core::pipeline::pipeline_logger::{LogPipelineLogger, PipelineLogger};
use minor_shield_core::shared::constants::IMAGE_FIELD;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    use_case: Arc<AnonymizeMinorsUseCase>,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(use_case: Arc<AnonymizeMinorsUseCase>, request_timeout: Duration) -> Self {
        Self {
            use_case,
            request_timeout,
        }
    }
}

#[derive(Debug)]
enum ApiError {
    NoImage,
    Malformed(String),
    TooLarge(String),
    Pipeline(PipelineError),
    Timeout(Duration),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
}

impl ApiError {
    fn from_multipart(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::TooLarge(err.body_text())
        } else {
            Self::Malformed(err.body_text())
        }
    }

    fn from_rejection(rejection: MultipartRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::TooLarge(rejection.body_text())
        } else {
            Self::Malformed(rejection.body_text())
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NoImage | Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Pipeline(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::NoImage | Self::Pipeline(PipelineError::NoImage) => "no_image",
            Self::Malformed(_) => "malformed_request",
            Self::TooLarge(_) => "payload_too_large",
            Self::Pipeline(PipelineError::Decode(_)) => "undecodable_image",
            Self::Pipeline(PipelineError::DetectionFailed(_)) => "detection_unavailable",
            Self::Pipeline(PipelineError::Encode(_)) | Self::Internal(_) => "internal_error",
            Self::Timeout(_) => "timeout",
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::NoImage => format!("multipart field '{IMAGE_FIELD}' is required"),
            Self::Malformed(detail) | Self::TooLarge(detail) | Self::Internal(detail) => {
                detail.clone()
            }
            Self::Pipeline(e) => e.to_string(),
            Self::Timeout(limit) => format!("request did not finish within {limit:?}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{} ({}): {}", status, self.code(), self.detail());
        } else {
            log::info!("{} ({}): {}", status, self.code(), self.detail());
        }
        let body = ErrorBody {
            error: self.code(),
            detail: self.detail(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/process", post(process))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Binds `bind` and serves until Ctrl-C.
pub async fn serve(bind: &str, state: AppState, max_upload_bytes: usize) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state, max_upload_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Could not listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn process(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let multipart = multipart.map_err(ApiError::from_rejection)?;
    let image = read_image_field(multipart).await?;

    let use_case = state.use_case.clone();
    let task = tokio::task::spawn_blocking(move || {
        let mut logger = LogPipelineLogger::new();
        let result = use_case.execute(&image, &mut logger);
        logger.summary();
        result
    });

    let output = match tokio::time::timeout(state.request_timeout, task).await {
        Err(_) => return Err(ApiError::Timeout(state.request_timeout)),
        Ok(Err(join_error)) => return Err(ApiError::Internal(join_error.to_string())),
        Ok(Ok(result)) => result.map_err(ApiError::Pipeline)?,
    };

    Ok(image_response(output))
}

async fn read_image_field(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(ApiError::from_multipart)?
    {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field.bytes().await.map_err(ApiError::from_multipart)?;
            if bytes.is_empty() {
                return Err(ApiError::NoImage);
            }
            return Ok(bytes.to_vec());
        }
    }
    Err(ApiError::NoImage)
}

fn image_response(output: PipelineOutput) -> Response {
    let faces = output.regions.len().to_string();
    let modified = output.modified_regions().to_string();
    log::info!(
        "Processed {}x{} image: {modified}/{faces} faces modified",
        output.width,
        output.height
    );

    let mut response = output.image.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(output.mime_type));
    if let Ok(value) = HeaderValue::from_str(&faces) {
        headers.insert("x-faces-detected", value);
    }
    if let Ok(value) = HeaderValue::from_str(&modified) {
        headers.insert("x-faces-modified", value);
    }
    response
}
