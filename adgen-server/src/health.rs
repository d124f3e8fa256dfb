//! Service descriptor endpoints.
//!
//! - `/` - Liveness banner
//! - `/api/health` - Version, rate limits and endpoint list

use axum::Json;
use serde::Serialize;

use crate::rate_limit::RatePolicy;
use crate::VERSION;

/// Root banner.
#[derive(Debug, Serialize)]
pub struct RootStatus {
    /// Always "ok".
    pub status: &'static str,
    /// Banner text.
    pub message: &'static str,
    /// Server version.
    pub version: &'static str,
}

/// A rate limit as advertised to clients.
#[derive(Debug, Serialize)]
pub struct RateLimitInfo {
    /// Requests allowed per window.
    pub requests: u32,
    /// Window length, e.g. "15 minutes".
    pub window: String,
}

impl From<RatePolicy> for RateLimitInfo {
    fn from(policy: RatePolicy) -> Self {
        Self {
            requests: policy.max_requests,
            window: policy.window_label(),
        }
    }
}

/// All advertised rate limits.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimits {
    /// Every request.
    pub global: RateLimitInfo,
    /// Uploads and background removal.
    pub upload: RateLimitInfo,
    /// Guideline analysis.
    pub ai_analysis: RateLimitInfo,
    /// Export optimization.
    pub export: RateLimitInfo,
}

/// Health descriptor response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// Always "healthy" while the process serves requests.
    pub status: &'static str,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Server version.
    pub version: &'static str,
    /// Enforced rate limits.
    pub rate_limits: RateLimits,
    /// Public endpoints.
    pub endpoints: Vec<&'static str>,
}

/// Public API endpoints.
pub const ENDPOINTS: &[&str] = &[
    "POST /api/upload",
    "POST /api/remove-background",
    "POST /api/analyze-guideline",
    "POST /api/export",
    "GET /api/health",
];

/// Root banner handler.
#[tracing::instrument(name = "root")]
pub async fn root() -> Json<RootStatus> {
    Json(RootStatus {
        status: "ok",
        message: "AdGen Co-Pilot API is running",
        version: VERSION,
    })
}

/// Health descriptor handler.
#[tracing::instrument(name = "health")]
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        timestamp: adgen_core::persist::current_timestamp_ms(),
        version: VERSION,
        rate_limits: RateLimits {
            global: RatePolicy::GLOBAL.into(),
            upload: RatePolicy::UPLOAD.into(),
            ai_analysis: RatePolicy::AI_ANALYSIS.into(),
            export: RatePolicy::EXPORT.into(),
        },
        endpoints: ENDPOINTS.to_vec(),
    })
}
