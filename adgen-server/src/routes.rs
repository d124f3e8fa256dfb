//! HTTP API handlers and router.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, FromRequest, MatchedPath, Multipart, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use adgen_core::GuidelineRules;

use crate::error::{ApiError, ServiceError};
use crate::rate_limit::{self, RateLimiters};
use crate::services::export::optimize_for_export;
use crate::services::{to_data_uri, UploadOptions, UploadedImage};
use crate::validation::{self, ValidationError, MAX_UPLOAD_BYTES};
use crate::{health, metrics, AppState};

/// An uploaded multipart file.
#[derive(Debug)]
struct FilePart {
    bytes: Bytes,
    content_type: Option<String>,
    file_name: Option<String>,
}

impl FilePart {
    fn mime(&self) -> &str {
        self.content_type
            .as_deref()
            .unwrap_or("application/octet-stream")
    }
}

/// Background removal result.
#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveBackgroundResponse {
    /// Always true.
    pub success: bool,
    /// Hosted image URL.
    pub url: String,
    /// Host-side identifier, when the result was re-uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
    /// Width in pixels, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Height in pixels, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// "remove_bg" or "cloudinary_ai".
    pub method: String,
}

/// Guideline analysis result.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    /// Always true.
    pub success: bool,
    /// Extracted rules as returned by the model.
    pub rules: Value,
}

/// Export result.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportResponse {
    /// Always true.
    pub success: bool,
    /// Optimized JPEG as a data URI.
    pub image: String,
    /// Output size in kilobytes, two decimals.
    pub size_kb: String,
}

/// Non-multipart export body.
#[derive(Debug, Deserialize)]
struct ExportBody {
    #[serde(default)]
    image: Option<String>,
}

/// Build the API router.
///
/// `/metrics` is mounted separately by the binary.
#[must_use]
pub fn api_router(state: AppState, limits: &RateLimiters) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/api/health", get(health::health))
        .route(
            "/api/upload",
            post(upload).layer(middleware::from_fn_with_state(
                Arc::clone(&limits.upload),
                rate_limit::enforce,
            )),
        )
        .route(
            "/api/remove-background",
            post(remove_background).layer(middleware::from_fn_with_state(
                Arc::clone(&limits.upload),
                rate_limit::enforce,
            )),
        )
        .route(
            "/api/analyze-guideline",
            post(analyze_guideline).layer(middleware::from_fn_with_state(
                Arc::clone(&limits.ai_analysis),
                rate_limit::enforce,
            )),
        )
        .route(
            "/api/export",
            post(export).layer(middleware::from_fn_with_state(
                Arc::clone(&limits.export),
                rate_limit::enforce,
            )),
        )
        .route_layer(middleware::from_fn(track_metrics))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&limits.global),
            rate_limit::enforce,
        ))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Record request count and latency per matched route.
async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path().to_string(), |p| p.as_str().to_string());

    let response = next.run(request).await;
    metrics::record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

/// Count a validation failure and convert it.
fn reject(error: ValidationError) -> ApiError {
    metrics::record_validation_failure(error.kind());
    ApiError::Validation(error)
}

fn multipart_error(error: &MultipartError) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        reject(ValidationError::TooLarge)
    } else {
        reject(ValidationError::Malformed(error.body_text()))
    }
}

/// Read the first non-empty field called `name`.
async fn read_file(mut multipart: Multipart, name: &str) -> Result<Option<FilePart>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        if field.name() != Some(name) {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;
        if bytes.is_empty() {
            continue;
        }
        return Ok(Some(FilePart {
            bytes,
            content_type,
            file_name,
        }));
    }
    Ok(None)
}

/// Read `name` from a multipart body; a non-multipart body has no file.
async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
    name: &str,
) -> Result<Option<FilePart>, ApiError> {
    match multipart {
        Ok(multipart) => read_file(multipart, name).await,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "request is not multipart");
            Ok(None)
        }
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T, ServiceError>
where
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await?
}

/// `POST /api/upload` - host an image.
#[tracing::instrument(name = "upload", skip(state, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadedImage>, ApiError> {
    let file = read_upload(multipart, "image")
        .await?
        .ok_or(ApiError::Missing("No file uploaded"))?;
    validation::validate_image_type(file.content_type.as_deref()).map_err(reject)?;

    let data_uri = to_data_uri(file.mime(), &file.bytes);
    let image = state
        .image_host
        .upload(data_uri, UploadOptions::default())
        .await
        .map_err(|e| ApiError::upstream("Image upload failed", e))?;
    Ok(Json(image))
}

/// `POST /api/remove-background` - strip the background and host the result.
#[tracing::instrument(name = "remove_background", skip(state, multipart))]
pub async fn remove_background(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RemoveBackgroundResponse>, ApiError> {
    let file = read_upload(multipart, "image")
        .await?
        .ok_or(ApiError::Missing("No image provided"))?;
    validation::validate_image_type(file.content_type.as_deref()).map_err(reject)?;

    let Some(remover) = state.background_remover.as_ref() else {
        let data_uri = to_data_uri(file.mime(), &file.bytes);
        let image = state
            .image_host
            .upload(
                data_uri,
                UploadOptions {
                    remove_background: true,
                },
            )
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Cloudinary AI background removal failed");
                ApiError::BackgroundRemovalUnavailable
            })?;
        return Ok(Json(RemoveBackgroundResponse {
            success: true,
            url: image.url,
            public_id: None,
            width: None,
            height: None,
            method: "cloudinary_ai".to_string(),
        }));
    };

    let file_name = file.file_name.clone().unwrap_or_else(|| "image".to_string());
    let mime = file.mime().to_string();
    let png = remover
        .remove_background(file.bytes.to_vec(), file_name, mime)
        .await
        .map_err(|e| {
            if e.upstream_status() == Some(StatusCode::PAYMENT_REQUIRED.as_u16()) {
                ApiError::CreditsExhausted
            } else {
                ApiError::upstream("Background removal failed", e)
            }
        })?;

    let image = state
        .image_host
        .upload(to_data_uri("image/png", &png), UploadOptions::default())
        .await
        .map_err(|e| ApiError::upstream("Background removal failed", e))?;

    Ok(Json(RemoveBackgroundResponse {
        success: true,
        url: image.url,
        public_id: Some(image.public_id),
        width: Some(image.width),
        height: Some(image.height),
        method: "remove_bg".to_string(),
    }))
}

/// `POST /api/analyze-guideline` - extract rules from a guideline PDF.
#[tracing::instrument(name = "analyze_guideline", skip(state, multipart))]
pub async fn analyze_guideline(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let file = read_upload(multipart, "pdf")
        .await?
        .ok_or(ApiError::Missing("No PDF uploaded"))?;
    validation::validate_pdf_type(file.content_type.as_deref()).map_err(reject)?;

    let extractor = Arc::clone(&state.text_extractor);
    let bytes = file.bytes;
    let text = run_blocking(move || extractor.extract_text(&bytes))
        .await
        .map_err(|e| ApiError::upstream("Guideline analysis failed", e))?;
    if !validation::has_enough_text(&text) {
        metrics::record_validation_failure("pdf_text");
        return Err(ApiError::InsufficientText);
    }

    let rules = state
        .analyzer
        .analyze(&text)
        .await
        .map_err(|e| ApiError::upstream("Guideline analysis failed", e))?;
    if !rules.is_object() {
        return Err(ApiError::upstream(
            "Guideline analysis failed",
            ServiceError::InvalidResponse("Analysis did not return a JSON object".into()),
        ));
    }

    match GuidelineRules::from_value(rules.clone()) {
        Ok(parsed) => tracing::info!(
            retailer = ?parsed.retailer_name,
            formats = parsed.canvas_formats().len(),
            "guidelines analyzed"
        ),
        Err(e) => tracing::warn!(error = %e, "analyzed rules do not match the editor schema"),
    }

    Ok(Json(AnalyzeResponse {
        success: true,
        rules,
    }))
}

/// Pull the image to export from a multipart, JSON or form body.
async fn read_export_input(state: &AppState, request: Request) -> Result<Vec<u8>, ApiError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let encoded = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| reject(ValidationError::Malformed(e.body_text())))?;
        match read_file(multipart, "image").await? {
            Some(file) if file.file_name.is_some() => return Ok(file.bytes.to_vec()),
            Some(file) => Some(String::from_utf8_lossy(&file.bytes).into_owned()),
            None => None,
        }
    } else if content_type.starts_with("application/json") {
        let Json(body) = Json::<ExportBody>::from_request(request, state)
            .await
            .map_err(|e| reject(ValidationError::Malformed(e.body_text())))?;
        body.image
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(body) = Form::<ExportBody>::from_request(request, state)
            .await
            .map_err(|e| reject(ValidationError::Malformed(e.body_text())))?;
        body.image
    } else {
        None
    };

    let encoded = encoded
        .filter(|s| !s.trim().is_empty())
        .ok_or(ApiError::Missing("No image provided"))?;
    validation::decode_image_data(&encoded).map_err(reject)
}

/// `POST /api/export` - compress an image into a JPEG under the size target.
#[tracing::instrument(name = "export", skip(state, request))]
#[allow(clippy::cast_precision_loss)]
pub async fn export(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<ExportResponse>, ApiError> {
    let input = read_export_input(&state, request).await?;
    let target_kb = state.export_target_kb;
    let input_len = input.len();

    let output = run_blocking(move || optimize_for_export(&input, target_kb))
        .await
        .map_err(|e| ApiError::upstream("Export optimization failed", e))?;
    metrics::record_export_size(output.len());
    tracing::info!(input = input_len, output = output.len(), "export optimized");

    Ok(Json(ExportResponse {
        success: true,
        size_kb: format!("{:.2}", output.len() as f64 / 1024.0),
        image: to_data_uri("image/jpeg", &output),
    }))
}
