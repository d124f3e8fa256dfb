//! # AdGen Server
//!
//! Backend proxy for the AdGen Co-Pilot editor. It holds no editor state;
//! every route forwards to an external service or a local media step:
//!
//! - `POST /api/upload` - host an image on Cloudinary
//! - `POST /api/remove-background` - remove.bg, or Cloudinary AI without a key
//! - `POST /api/analyze-guideline` - PDF text through Ollama into rules
//! - `POST /api/export` - JPEG optimization under a size target
//!
//! Services sit behind traits in [`services`] so the router can be driven
//! with fakes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod rate_limit;
pub mod routes;
pub mod services;
pub mod validation;

use std::sync::Arc;

pub use config::{CliArgs, ServerConfig};
pub use error::{ApiError, ServiceError};
pub use rate_limit::RateLimiters;
pub use routes::api_router;

use services::{
    BackgroundRemover, CloudinaryClient, GuidelineAnalyzer, ImageHost, OllamaClient,
    PdfExtractor, RemoveBgClient, TextExtractor,
};

/// Shared state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Image hosting.
    pub image_host: Arc<dyn ImageHost>,
    /// Dedicated background remover; Cloudinary AI is used when absent.
    pub background_remover: Option<Arc<dyn BackgroundRemover>>,
    /// Guideline analysis.
    pub analyzer: Arc<dyn GuidelineAnalyzer>,
    /// PDF text extraction.
    pub text_extractor: Arc<dyn TextExtractor>,
    /// Export size target in kilobytes.
    pub export_target_kb: usize,
}

impl AppState {
    /// Build the production services from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured URL is malformed or an HTTP client
    /// cannot be built.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServiceError> {
        let cloudinary = CloudinaryClient::new(&config.cloudinary, config.request_timeout)?;
        if !cloudinary.is_configured() {
            tracing::warn!("Cloudinary credentials missing; uploads will fail");
        }

        let background_remover: Option<Arc<dyn BackgroundRemover>> =
            match &config.remove_bg_api_key {
                Some(key) => Some(Arc::new(RemoveBgClient::new(
                    &config.remove_bg_url,
                    key.clone(),
                    config.request_timeout,
                )?)),
                None => {
                    tracing::info!("REMOVE_BG_API_KEY not set; using Cloudinary AI background removal");
                    None
                }
            };

        let ollama = OllamaClient::new(
            &config.ollama_host,
            config.ollama_model.clone(),
            config.request_timeout,
        )?;

        Ok(Self {
            image_host: Arc::new(cloudinary),
            background_remover,
            analyzer: Arc::new(ollama),
            text_extractor: Arc::new(PdfExtractor),
            export_target_kb: config.export_target_kb,
        })
    }
}

/// Server version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
