//! remove.bg background removal.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use url::Url;

use super::{check_status, BackgroundRemover};
use crate::error::ServiceError;
use crate::metrics;

/// Client for the remove.bg API.
#[derive(Debug, Clone)]
pub struct RemoveBgClient {
    http: Client,
    endpoint: Url,
    api_key: String,
}

impl RemoveBgClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidUrl`] if the endpoint is malformed.
    /// Returns [`ServiceError::Http`] if the HTTP client fails to build.
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .user_agent(concat!("adgen-server/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: Url::parse(endpoint)?,
            api_key: api_key.into(),
        })
    }

    async fn post_image(
        &self,
        image: Vec<u8>,
        file_name: String,
        content_type: String,
    ) -> Result<Vec<u8>, ServiceError> {
        let part = multipart::Part::bytes(image)
            .file_name(file_name)
            .mime_str(&content_type)?;
        let form = multipart::Form::new()
            .part("image_file", part)
            .text("size", "auto");

        let response = self
            .http
            .post(self.endpoint.clone())
            .header("X-Api-Key", &self.api_key)
            .multipart(form)
            .send()
            .await?;
        let response = check_status("remove.bg", response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl BackgroundRemover for RemoveBgClient {
    #[tracing::instrument(name = "remove_bg", skip(self, image), fields(bytes = image.len()))]
    async fn remove_background(
        &self,
        image: Vec<u8>,
        file_name: String,
        content_type: String,
    ) -> Result<Vec<u8>, ServiceError> {
        let result = self.post_image(image, file_name, content_type).await;
        metrics::record_upstream_call("remove_bg", result.is_ok());
        if let Err(e) = &result {
            tracing::warn!(error = %e, "remove.bg request failed");
        }
        result
    }
}
