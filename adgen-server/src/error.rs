//! Error types for outbound services and HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

use crate::validation::ValidationError;

/// Errors from external services and local media processing.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream returned a non-success status.
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        /// Service name.
        service: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Upstream answered with an unusable payload.
    #[error("{0}")]
    InvalidResponse(String),

    /// Ollama could not be reached.
    #[error("Ollama is not running. Start with: ollama serve")]
    OllamaUnavailable,

    /// A service is missing credentials.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// A configured URL is malformed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// PDF text extraction failed.
    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    /// Image decode or encode failed.
    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),

    /// A blocking worker task panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ServiceError {
    /// Upstream HTTP status, if the failure carried one.
    #[must_use]
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Errors returned to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required multipart field or body value is missing.
    #[error("{0}")]
    Missing(&'static str),

    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The PDF held too little text to analyze.
    #[error("Insufficient text found in PDF")]
    InsufficientText,

    /// Neither remove.bg nor Cloudinary AI could remove the background.
    #[error("Background removal unavailable")]
    BackgroundRemovalUnavailable,

    /// remove.bg reported exhausted credits.
    #[error("API credits exhausted")]
    CreditsExhausted,

    /// Client exceeded a rate limit.
    #[error("{error}")]
    RateLimited {
        /// Short error title.
        error: &'static str,
        /// Human-readable explanation.
        message: &'static str,
        /// Seconds until a retry may succeed.
        retry_after: u64,
    },

    /// An upstream service or processing step failed.
    #[error("{error}: {source}")]
    Upstream {
        /// Error title shown to the client.
        error: &'static str,
        /// Underlying failure.
        #[source]
        source: ServiceError,
    },
}

impl ApiError {
    /// Wrap a service failure under a client-facing title.
    #[must_use]
    pub fn upstream(error: &'static str, source: ServiceError) -> Self {
        Self::Upstream { error, source }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Missing(_)
            | Self::Validation(_)
            | Self::InsufficientText
            | Self::BackgroundRemovalUnavailable => StatusCode::BAD_REQUEST,
            Self::CreditsExhausted => StatusCode::PAYMENT_REQUIRED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            Self::Missing(error) => json!({ "error": error }),
            Self::Validation(e) => json!({ "error": e.to_string() }),
            Self::InsufficientText => json!({
                "error": "Insufficient text found in PDF",
                "details": "The PDF appears to be scanned or image-based. Please upload a text-based PDF.",
            }),
            Self::BackgroundRemovalUnavailable => json!({
                "error": "Background removal unavailable",
                "message": "Set REMOVE_BG_API_KEY in environment variables or enable Cloudinary AI",
            }),
            Self::CreditsExhausted => json!({
                "error": "API credits exhausted",
                "message": "Remove.bg API credits have been used up. Please add more credits.",
            }),
            Self::RateLimited {
                error,
                message,
                retry_after,
            } => json!({
                "error": error,
                "message": message,
                "retryAfter": retry_after,
            }),
            Self::Upstream { error, source } => json!({
                "error": error,
                "details": source.to_string(),
            }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}
