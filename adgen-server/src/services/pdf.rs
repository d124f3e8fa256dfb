//! PDF text extraction.

use super::TextExtractor;
use crate::error::ServiceError;

/// Extracts text with `pdf-extract`.
///
/// Parsing is CPU-bound; call it from `spawn_blocking`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract_text(&self, pdf: &[u8]) -> Result<String, ServiceError> {
        let text =
            pdf_extract::extract_text_from_mem(pdf).map_err(|e| ServiceError::Pdf(e.to_string()))?;
        tracing::debug!(bytes = pdf.len(), chars = text.len(), "extracted PDF text");
        Ok(text)
    }
}
