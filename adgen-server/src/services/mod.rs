//! Outbound services the HTTP routes delegate to.
//!
//! Each concern sits behind a trait so routes can be exercised with fakes.

pub mod cloudinary;
pub mod export;
pub mod ollama;
pub mod pdf;
pub mod relevance;
pub mod removebg;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ServiceError;

pub use cloudinary::CloudinaryClient;
pub use ollama::OllamaClient;
pub use pdf::PdfExtractor;
pub use removebg::RemoveBgClient;

/// Upload options for the image host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Ask the host to strip the background while uploading.
    pub remove_background: bool,
}

/// A hosted image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    /// Public HTTPS URL.
    pub url: String,
    /// Host-side identifier.
    pub public_id: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Stores images and returns public URLs.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload a `data:` URI.
    async fn upload(
        &self,
        data_uri: String,
        options: UploadOptions,
    ) -> Result<UploadedImage, ServiceError>;
}

/// Removes image backgrounds, returning PNG bytes.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Remove the background from an encoded image.
    async fn remove_background(
        &self,
        image: Vec<u8>,
        file_name: String,
        content_type: String,
    ) -> Result<Vec<u8>, ServiceError>;
}

/// Turns guideline text into structured rules.
#[async_trait]
pub trait GuidelineAnalyzer: Send + Sync {
    /// Analyze guideline text, returning the parsed JSON rules.
    async fn analyze(&self, text: &str) -> Result<Value, ServiceError>;
}

/// Extracts plain text from PDF documents.
pub trait TextExtractor: Send + Sync {
    /// Extract all text from PDF bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Pdf`] if the document cannot be parsed.
    fn extract_text(&self, pdf: &[u8]) -> Result<String, ServiceError>;
}

/// Encode bytes as a base64 `data:` URI.
#[must_use]
pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{mime};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Keep error bodies short enough for logs.
fn truncate_body(body: String) -> String {
    const MAX_BODY: usize = 512;
    if body.len() <= MAX_BODY {
        return body;
    }
    let mut end = MAX_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// Turn a non-success response into [`ServiceError::Status`].
async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Status {
        service,
        status: status.as_u16(),
        body: truncate_body(body),
    })
}
