//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`.  The status code is
//! derived from the domain error's kind in one place, so no endpoint
//! special-cases its failures.
//!
//! **Security note:** internal errors are logged with full detail but the
//! caller only sees a generic message.

use axum::Json;
use axum::extract::FromRequest;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use studio_core::{ErrorKind, GenerationError};
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

/// Message returned for every internal error.
pub const GENERIC_INTERNAL_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug, Error)]
pub enum ServerError {
    /// Propagated from the generation pipeline.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The request could not be parsed at all (bad JSON, unknown enum key,
    /// malformed query string).
    #[error("{0}")]
    BadRequest(String),
}

/// JSON error body.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Machine-readable code, e.g. `VALIDATION_ERROR`.
    pub error: &'static str,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::UnsupportedMode => StatusCode::NOT_IMPLEMENTED,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let err = match self {
            ServerError::Generation(e) => e,
            ServerError::BadRequest(message) => GenerationError::invalid("body", message),
        };

        let kind = err.kind();
        let message = match kind {
            ErrorKind::Internal => {
                error!(error = %err, "internal server error");
                GENERIC_INTERNAL_MESSAGE.to_owned()
            }
            ErrorKind::Upstream => {
                error!(error = %err, "upstream provider error");
                err.to_string()
            }
            _ => err.to_string(),
        };

        let retry_after = err.retry_after_secs();
        let body = ErrorBody {
            error: err.code(),
            message,
            timestamp: Utc::now(),
            retry_after_seconds: retry_after,
        };

        let mut response = (status_for(kind), Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(rejection: QueryRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

/// `Json` extractor whose rejection goes through [`ServerError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ServerError))]
pub struct AppJson<T>(pub T);

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use tracing_test::traced_test;

    use super::*;

    async fn parts(err: ServerError) -> (StatusCode, Option<String>, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let retry = response
            .headers()
            .get(header::RETRY_AFTER)
            .map(|v| v.to_str().unwrap().to_owned());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, retry, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn quota_sets_header_and_body_hint() {
        let (status, retry, body) =
            parts(GenerationError::QuotaExceeded { retry_after_secs: 17 }.into()).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(retry.as_deref(), Some("17"));
        assert_eq!(body["error"], "QUOTA_EXCEEDED");
        assert_eq!(body["retryAfterSeconds"], 17);
    }

    #[tokio::test]
    #[traced_test]
    async fn internal_detail_never_leaks() {
        let (status, retry, body) =
            parts(GenerationError::Internal("/var/data/secret.png: disk full".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(retry.is_none());
        assert_eq!(body["message"], GENERIC_INTERNAL_MESSAGE);
        assert!(body.get("retryAfterSeconds").is_none());
        assert!(logs_contain("disk full"));
    }

    #[tokio::test]
    async fn every_kind_has_its_status() {
        let cases = [
            (GenerationError::invalid("subject", "Subject is required"), 400, "VALIDATION_ERROR"),
            (GenerationError::Upstream("502 from provider".into()), 502, "UPSTREAM_ERROR"),
            (GenerationError::NotFound("img_x".into()), 404, "NOT_FOUND"),
            (
                GenerationError::UnsupportedMode(studio_core::descriptors::OperationMode::MultiImage),
                501,
                "UNSUPPORTED_MODE",
            ),
        ];
        for (err, status, code) in cases {
            let (actual, _, body) = parts(err.into()).await;
            assert_eq!(actual.as_u16(), status);
            assert_eq!(body["error"], code);
            assert!(body["timestamp"].is_string());
        }
    }

    #[tokio::test]
    async fn bad_request_is_a_validation_error() {
        let (status, _, body) = parts(ServerError::BadRequest("expected value".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert_eq!(body["message"], "body: expected value");
    }
}
