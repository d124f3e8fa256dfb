//! Shared fixtures for adgen-server integration tests.

#![allow(dead_code)]

mod server;

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use adgen_server::services::{
    BackgroundRemover, GuidelineAnalyzer, ImageHost, TextExtractor, UploadOptions, UploadedImage,
};
use adgen_server::{AppState, ServiceError};
use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::Value;

pub use server::TestServer;

/// Image host that records uploads.
#[derive(Default)]
pub struct FakeHost {
    pub uploads: Mutex<Vec<(String, UploadOptions)>>,
    pub fail: bool,
}

impl FakeHost {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn recorded(&self) -> Vec<(String, UploadOptions)> {
        self.uploads.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ImageHost for FakeHost {
    async fn upload(
        &self,
        data_uri: String,
        options: UploadOptions,
    ) -> Result<UploadedImage, ServiceError> {
        if self.fail {
            return Err(ServiceError::Status {
                service: "Cloudinary",
                status: 500,
                body: "boom".into(),
            });
        }
        let mut uploads = self.uploads.lock().expect("lock");
        uploads.push((data_uri, options));
        let n = uploads.len();
        Ok(UploadedImage {
            url: format!("https://cdn.test/adgen_uploads/{n}.png"),
            public_id: format!("adgen_uploads/{n}"),
            width: 64,
            height: 48,
        })
    }
}

/// Background remover answering with fixed bytes or an HTTP status.
pub struct FakeRemover {
    pub status: Option<u16>,
}

#[async_trait]
impl BackgroundRemover for FakeRemover {
    async fn remove_background(
        &self,
        _image: Vec<u8>,
        _file_name: String,
        _content_type: String,
    ) -> Result<Vec<u8>, ServiceError> {
        match self.status {
            Some(status) => Err(ServiceError::Status {
                service: "remove.bg",
                status,
                body: String::new(),
            }),
            None => Ok(vec![0x89, b'P', b'N', b'G']),
        }
    }
}

/// Analyzer returning fixed rules, or Ollama being down.
pub struct FakeAnalyzer {
    pub rules: Option<Value>,
}

#[async_trait]
impl GuidelineAnalyzer for FakeAnalyzer {
    async fn analyze(&self, _text: &str) -> Result<Value, ServiceError> {
        self.rules.clone().ok_or(ServiceError::OllamaUnavailable)
    }
}

/// Extractor returning fixed text for any input.
pub struct FakeExtractor {
    pub text: String,
}

impl TextExtractor for FakeExtractor {
    fn extract_text(&self, _pdf: &[u8]) -> Result<String, ServiceError> {
        Ok(self.text.clone())
    }
}

/// Guideline text long enough to pass the PDF text check.
pub fn guideline_text() -> String {
    "Tesco retail media guidelines. Square 1080x1080 banners, max file size 500KB, \
     keep a 10% safe zone around the logo."
        .to_string()
}

/// Rules as the model would return them.
pub fn tesco_rules() -> Value {
    serde_json::json!({
        "retailer_name": "Tesco",
        "ad_formats": [
            { "type": "Square", "width_px": 1080, "height_px": 1080, "aspect_ratio": "1:1" }
        ],
        "constraints": { "safe_zone_margin_px": 40, "max_file_size_kb": 500 }
    })
}

/// State backed entirely by fakes.
pub fn fake_state(host: Arc<FakeHost>) -> AppState {
    AppState {
        image_host: host,
        background_remover: None,
        analyzer: Arc::new(FakeAnalyzer {
            rules: Some(tesco_rules()),
        }),
        text_extractor: Arc::new(FakeExtractor {
            text: guideline_text(),
        }),
        export_target_kb: 500,
    }
}

/// A small solid PNG.
pub fn png_bytes() -> Vec<u8> {
    let image = RgbImage::from_pixel(32, 24, Rgb([10, 120, 200]));
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("encode png");
    buffer.into_inner()
}

/// Multipart form with a single file field.
pub fn file_form(field: &str, file_name: &str, mime: &str, bytes: Vec<u8>) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(mime)
        .expect("mime");
    reqwest::multipart::Form::new().part(field.to_string(), part)
}
