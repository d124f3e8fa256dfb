//! Cloudinary image host.
//!
//! Uploads are signed: the sorted upload parameters are joined as
//! `key=value&...`, the API secret appended, and the SHA-1 hex digest sent as
//! `signature`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use url::Url;

use super::{check_status, ImageHost, UploadOptions, UploadedImage};
use crate::config::CloudinaryConfig;
use crate::error::ServiceError;
use crate::metrics;

/// Folder every upload lands in.
pub const UPLOAD_FOLDER: &str = "adgen_uploads";

/// Cloudinary's AI background-removal add-on.
pub const BACKGROUND_REMOVAL_ADDON: &str = "cloudinary_ai";

#[derive(Debug, Clone)]
struct Credentials {
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

/// Signed-upload client for Cloudinary.
#[derive(Debug, Clone)]
pub struct CloudinaryClient {
    http: Client,
    api_url: String,
    credentials: Option<Credentials>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

impl CloudinaryClient {
    /// Create a client. Missing credentials make every upload fail with
    /// [`ServiceError::NotConfigured`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidUrl`] if the API URL is malformed.
    /// Returns [`ServiceError::Http`] if the HTTP client fails to build.
    pub fn new(config: &CloudinaryConfig, timeout: Duration) -> Result<Self, ServiceError> {
        Url::parse(&config.api_url)?;
        let credentials = match (&config.cloud_name, &config.api_key, &config.api_secret) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(Credentials {
                cloud_name: cloud_name.clone(),
                api_key: api_key.clone(),
                api_secret: api_secret.clone(),
            }),
            _ => None,
        };
        let http = Client::builder()
            .user_agent(concat!("adgen-server/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Whether credentials were supplied.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn post_upload(
        &self,
        data_uri: String,
        options: UploadOptions,
    ) -> Result<UploadedImage, ServiceError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(ServiceError::NotConfigured("Cloudinary"))?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
            .to_string();
        let mut params = vec![("folder", UPLOAD_FOLDER.to_string()), ("timestamp", timestamp)];
        if options.remove_background {
            params.push(("background_removal", BACKGROUND_REMOVAL_ADDON.to_string()));
        }
        let signature = sign(&params, &credentials.api_secret);

        let mut form = multipart::Form::new()
            .text("file", data_uri)
            .text("api_key", credentials.api_key.clone())
            .text("signature", signature);
        for (key, value) in params {
            form = form.text(key, value);
        }

        let endpoint = format!("{}/{}/auto/upload", self.api_url, credentials.cloud_name);
        let response = self.http.post(&endpoint).multipart(form).send().await?;
        let response = check_status("Cloudinary", response).await?;
        let body: UploadResponse = response.json().await?;

        Ok(UploadedImage {
            url: body.secure_url,
            public_id: body.public_id,
            width: body.width,
            height: body.height,
        })
    }
}

/// Sign upload parameters with the API secret.
#[must_use]
pub fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl ImageHost for CloudinaryClient {
    #[tracing::instrument(name = "cloudinary_upload", skip(self, data_uri), fields(bytes = data_uri.len()))]
    async fn upload(
        &self,
        data_uri: String,
        options: UploadOptions,
    ) -> Result<UploadedImage, ServiceError> {
        let result = self.post_upload(data_uri, options).await;
        metrics::record_upstream_call("cloudinary", result.is_ok());
        match &result {
            Ok(image) => tracing::info!(public_id = %image.public_id, "image uploaded"),
            Err(e) => tracing::warn!(error = %e, "Cloudinary upload failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_url: &str) -> CloudinaryConfig {
        CloudinaryConfig {
            cloud_name: Some("demo".into()),
            api_key: Some("key".into()),
            api_secret: Some("abc".into()),
            api_url: api_url.to_string(),
        }
    }

    #[test]
    fn test_signature_sorts_params() {
        let params = [
            ("timestamp", "1700000000".to_string()),
            ("folder", UPLOAD_FOLDER.to_string()),
        ];
        assert_eq!(sign(&params, "abc"), "dd4d88c4384654b8f12521a90d90949091bc7a28");

        let with_removal = [
            ("folder", UPLOAD_FOLDER.to_string()),
            ("timestamp", "1700000000".to_string()),
            ("background_removal", BACKGROUND_REMOVAL_ADDON.to_string()),
        ];
        assert_eq!(
            sign(&with_removal, "abc"),
            "a916cdf185551c32c81a963316ec62fb321fd8c5"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_upload_fails() {
        let client = CloudinaryClient::new(
            &CloudinaryConfig {
                api_url: "https://api.cloudinary.com/v1_1".into(),
                ..CloudinaryConfig::default()
            },
            Duration::from_secs(5),
        )
        .expect("client");
        assert!(!client.is_configured());
        let err = client
            .upload("data:image/png;base64,AA==".into(), UploadOptions::default())
            .await
            .expect_err("should fail");
        assert!(matches!(err, ServiceError::NotConfigured("Cloudinary")));
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_upload_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/demo/auto/upload"))
            .and(body_string_contains(UPLOAD_FOLDER))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "secure_url": "https://res.cloudinary.com/demo/adgen_uploads/a.png",
                "public_id": "adgen_uploads/a",
                "width": 640,
                "height": 480,
            })))
            .mount(&server)
            .await;

        let client =
            CloudinaryClient::new(&config(&server.uri()), Duration::from_secs(5)).expect("client");
        let image = client
            .upload("data:image/png;base64,AA==".into(), UploadOptions::default())
            .await
            .expect("upload");
        assert_eq!(image.public_id, "adgen_uploads/a");
        assert_eq!((image.width, image.height), (640, 480));
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_background_removal_flag_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/demo/auto/upload"))
            .and(body_string_contains(BACKGROUND_REMOVAL_ADDON))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "secure_url": "https://res.cloudinary.com/demo/b.png",
                "public_id": "adgen_uploads/b",
            })))
            .mount(&server)
            .await;

        let client =
            CloudinaryClient::new(&config(&server.uri()), Duration::from_secs(5)).expect("client");
        let image = client
            .upload(
                "data:image/png;base64,AA==".into(),
                UploadOptions {
                    remove_background: true,
                },
            )
            .await
            .expect("upload");
        assert_eq!(image.url, "https://res.cloudinary.com/demo/b.png");
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_upstream_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Signature"))
            .mount(&server)
            .await;

        let client =
            CloudinaryClient::new(&config(&server.uri()), Duration::from_secs(5)).expect("client");
        let err = client
            .upload("data:image/png;base64,AA==".into(), UploadOptions::default())
            .await
            .expect_err("should fail");
        assert_eq!(err.upstream_status(), Some(401));
    }
}
