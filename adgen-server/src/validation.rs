//! Input validation for untrusted uploads.
//!
//! Every file and body value MUST pass through here before reaching a
//! service.

use base64::Engine;
use thiserror::Error;

/// Maximum request body and upload size.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
/// Minimum trimmed characters a PDF must yield to be analyzed.
pub const MIN_PDF_TEXT_CHARS: usize = 50;

const DATA_IMAGE_PREFIX: &str = "data:image/";
const BASE64_MARKER: &str = ";base64,";

/// Validation error types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Image endpoint received a non-image file.
    #[error("Invalid file type. Please upload an image.")]
    NotAnImage,
    /// PDF endpoint received a non-PDF file.
    #[error("Invalid file type. Please upload a PDF.")]
    NotAPdf,
    /// Upload exceeds the size limit.
    #[error("File too large (max {MAX_UPLOAD_BYTES} bytes)")]
    TooLarge,
    /// Base64 image payload did not decode.
    #[error("Invalid image data")]
    InvalidImageData,
    /// Request body could not be parsed.
    #[error("Malformed request: {0}")]
    Malformed(String),
}

impl ValidationError {
    /// Short label used for metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotAnImage => "image_type",
            Self::NotAPdf => "pdf_type",
            Self::TooLarge => "size",
            Self::InvalidImageData => "image_data",
            Self::Malformed(_) => "malformed",
        }
    }
}

/// Validate that an upload declares an `image/*` content type.
///
/// # Errors
///
/// Returns [`ValidationError::NotAnImage`] for any other type, including none.
pub fn validate_image_type(content_type: Option<&str>) -> Result<(), ValidationError> {
    match content_type {
        Some(ct) if ct.trim().to_ascii_lowercase().starts_with("image/") => Ok(()),
        _ => Err(ValidationError::NotAnImage),
    }
}

/// Validate that an upload is `application/pdf`.
///
/// # Errors
///
/// Returns [`ValidationError::NotAPdf`] for any other type, including none.
pub fn validate_pdf_type(content_type: Option<&str>) -> Result<(), ValidationError> {
    match content_type {
        Some(ct) if ct.trim().eq_ignore_ascii_case("application/pdf") => Ok(()),
        _ => Err(ValidationError::NotAPdf),
    }
}

/// Validate upload size.
///
/// # Errors
///
/// Returns [`ValidationError::TooLarge`] above [`MAX_UPLOAD_BYTES`].
pub fn validate_upload_size(len: usize) -> Result<(), ValidationError> {
    if len > MAX_UPLOAD_BYTES {
        return Err(ValidationError::TooLarge);
    }
    Ok(())
}

/// Whether extracted PDF text is long enough to analyze.
#[must_use]
pub fn has_enough_text(text: &str) -> bool {
    text.trim().chars().count() >= MIN_PDF_TEXT_CHARS
}

/// Strip a leading `data:image/<type>;base64,` prefix, if present.
#[must_use]
pub fn strip_data_uri_prefix(data: &str) -> &str {
    let Some(rest) = data.strip_prefix(DATA_IMAGE_PREFIX) else {
        return data;
    };
    let subtype_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if subtype_len == 0 {
        return data;
    }
    rest[subtype_len..].strip_prefix(BASE64_MARKER).unwrap_or(data)
}

/// Decode a base64 image, with or without a data URI prefix.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidImageData`] if the payload is not valid
/// base64, or [`ValidationError::TooLarge`] if it decodes past the limit.
pub fn decode_image_data(data: &str) -> Result<Vec<u8>, ValidationError> {
    let payload = strip_data_uri_prefix(data.trim());
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|_| ValidationError::InvalidImageData)?;
    validate_upload_size(bytes.len())?;
    Ok(bytes)
}
