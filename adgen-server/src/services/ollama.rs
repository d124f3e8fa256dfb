//! Guideline analysis through a local Ollama model.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::relevance::filter_relevant_content;
use super::{check_status, GuidelineAnalyzer};
use crate::error::ServiceError;
use crate::metrics;

/// Instructions sent ahead of the guideline text.
pub const SYSTEM_PROMPT: &str = r#"
### ROLE
You are the technical compliance agent of AdGen Co-Pilot. You turn unstructured retail media guideline text into machine-readable validation rules.

### OBJECTIVE
The input is raw text extracted from a retailer's guideline PDF. Identify the technical constraints that apply when producing ad images. Extract constraint logic only.

### EXTRACTION TARGETS
1. SAFE ZONES: "margin", "buffer", "clear space", "padding".
2. DIMENSIONS: "pixels", "px", "width", "height", aspect ratios such as 1:1 or 1200x628.
3. FILE SPECS: "KB", "MB", "JPEG", "PNG", "max file size".
4. COLORS AND BRANDING: hex codes, "contrast", explicit color rules.

### RESPONSE FORMAT
Respond with a single JSON object using this schema and nothing else:
{
  "retailer_name": "String or null",
  "ad_formats": [
    { "type": "String", "width_px": Integer, "height_px": Integer, "aspect_ratio": "String" }
  ],
  "constraints": {
    "safe_zone_margin_px": Integer (default 0),
    "max_file_size_kb": Integer (default 500),
    "allowed_file_types": ["Array", "of", "Strings"],
    "forbidden_content": ["Array", "of", "Strings"],
    "recommended_colors": ["Array", "of", "Hex Codes"],
    "contrast_requirements": "String or null"
  }
}

### ERROR HANDLING
- When the text implies a rule without giving a number, use null.
- Never invent values.
"#;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

/// Build the full prompt for a guideline text.
#[must_use]
pub fn build_prompt(text: &str) -> String {
    format!(
        "{SYSTEM_PROMPT}\n\n### INPUT TEXT:\n{}",
        filter_relevant_content(text)
    )
}

/// Client for Ollama's `/api/generate` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: Client,
    endpoint: Url,
    model: String,
}

impl OllamaClient {
    /// Create a client for `host` (e.g., `http://localhost:11434`).
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidUrl`] if the host is malformed.
    /// Returns [`ServiceError::Http`] if the HTTP client fails to build.
    pub fn new(
        host: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let endpoint = Url::parse(&format!("{}/api/generate", host.trim_end_matches('/')))?;
        let http = Client::builder()
            .user_agent(concat!("adgen-server/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint,
            model: model.into(),
        })
    }

    /// Model name sent with each request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, text: &str) -> Result<Value, ServiceError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: build_prompt(text),
            stream: false,
            format: "json",
        };

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ServiceError::OllamaUnavailable
                } else {
                    ServiceError::Http(e)
                }
            })?;
        let response = check_status("Ollama", response).await?;
        let body: GenerateResponse = response.json().await?;

        let raw = body
            .response
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| ServiceError::InvalidResponse("Invalid response from Ollama".into()))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[async_trait]
impl GuidelineAnalyzer for OllamaClient {
    #[tracing::instrument(name = "ollama_analyze", skip(self, text), fields(model = %self.model, chars = text.len()))]
    async fn analyze(&self, text: &str) -> Result<Value, ServiceError> {
        let result = self.generate(text).await;
        metrics::record_upstream_call("ollama", result.is_ok());
        if let Err(e) = &result {
            tracing::warn!(error = %e, "guideline analysis failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OllamaClient {
        OllamaClient::new(&server.uri(), "llama3.2", Duration::from_secs(5)).expect("client")
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = build_prompt("Logos need 20px clear space.");
        assert!(prompt.starts_with(SYSTEM_PROMPT));
        assert!(prompt.ends_with("### INPUT TEXT:\nLogos need 20px clear space."));
    }

    #[test]
    fn test_endpoint_from_host() {
        let client = OllamaClient::new("http://ollama:11434/", "m", Duration::from_secs(1))
            .expect("client");
        assert_eq!(client.endpoint.as_str(), "http://ollama:11434/api/generate");
        assert!(OllamaClient::new("not a url", "m", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_analyze_parses_response_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({
                "model": "llama3.2",
                "stream": false,
                "format": "json",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3.2",
                "response": "{\"retailer_name\":\"Tesco\",\"constraints\":{\"max_file_size_kb\":500}}",
                "done": true,
            })))
            .mount(&server)
            .await;

        let rules = client_for(&server)
            .analyze("Tesco guidelines: files under 500KB")
            .await
            .expect("rules");
        assert_eq!(rules["retailer_name"], "Tesco");
        assert_eq!(rules["constraints"]["max_file_size_kb"], 500);
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_missing_response_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "done": true })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .analyze("text")
            .await
            .expect_err("should fail");
        assert_eq!(err.to_string(), "Invalid response from Ollama");
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_unparseable_response_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "response": "not json" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .analyze("text")
            .await
            .expect_err("should fail");
        assert!(matches!(err, ServiceError::Json(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_unavailable() {
        let port = portpicker::pick_unused_port().expect("free port");
        let client = OllamaClient::new(
            &format!("http://127.0.0.1:{port}"),
            "llama3.2",
            Duration::from_secs(5),
        )
        .expect("client");
        let err = client.analyze("text").await.expect_err("should fail");
        assert!(matches!(err, ServiceError::OllamaUnavailable));
    }
}
