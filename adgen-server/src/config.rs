//! Server configuration from command-line flags and environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 5001;

/// Default Cloudinary upload API base.
pub const DEFAULT_CLOUDINARY_API: &str = "https://api.cloudinary.com/v1_1";

/// Default remove.bg endpoint.
pub const DEFAULT_REMOVE_BG_URL: &str = "https://api.remove.bg/v1.0/removebg";

/// Default Ollama host.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Default Ollama model.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// Default outbound request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default export size target in kilobytes.
pub const DEFAULT_EXPORT_TARGET_KB: usize = 500;

/// Command-line arguments for adgen-server.
#[derive(Debug, Clone, Parser)]
#[command(name = "adgen-server")]
#[command(about = "AdGen Co-Pilot backend proxy")]
#[command(version)]
pub struct CliArgs {
    /// Address to bind
    #[arg(long, env = "ADGEN_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Cloudinary cloud name
    #[arg(long, env = "CLOUDINARY_CLOUD_NAME")]
    pub cloudinary_cloud_name: Option<String>,

    /// Cloudinary API key
    #[arg(long, env = "CLOUDINARY_API_KEY")]
    pub cloudinary_api_key: Option<String>,

    /// Cloudinary API secret
    #[arg(long, env = "CLOUDINARY_API_SECRET", hide_env_values = true)]
    pub cloudinary_api_secret: Option<String>,

    /// Cloudinary API base URL
    #[arg(long, env = "CLOUDINARY_API_URL", default_value = DEFAULT_CLOUDINARY_API)]
    pub cloudinary_api_url: String,

    /// remove.bg API key; without it Cloudinary AI removal is used
    #[arg(long, env = "REMOVE_BG_API_KEY", hide_env_values = true)]
    pub remove_bg_api_key: Option<String>,

    /// remove.bg endpoint
    #[arg(long, env = "REMOVE_BG_API_URL", default_value = DEFAULT_REMOVE_BG_URL)]
    pub remove_bg_url: String,

    /// Ollama host (e.g., <http://localhost:11434>)
    #[arg(long, env = "OLLAMA_HOST", default_value = DEFAULT_OLLAMA_HOST)]
    pub ollama_host: String,

    /// Ollama model used for guideline analysis
    #[arg(long, env = "OLLAMA_MODEL", default_value = DEFAULT_OLLAMA_MODEL)]
    pub ollama_model: String,

    /// Timeout for outbound requests, in seconds
    #[arg(long, env = "ADGEN_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    /// Export size target in kilobytes
    #[arg(long, env = "ADGEN_EXPORT_TARGET_KB", default_value_t = DEFAULT_EXPORT_TARGET_KB)]
    pub export_target_kb: usize,

    /// Allowed CORS origins, comma separated; any origin when empty
    #[arg(long, env = "ADGEN_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,
}

/// Cloudinary credentials.
#[derive(Debug, Clone, Default)]
pub struct CloudinaryConfig {
    /// Cloud name.
    pub cloud_name: Option<String>,
    /// API key.
    pub api_key: Option<String>,
    /// API secret.
    pub api_secret: Option<String>,
    /// Upload API base URL.
    pub api_url: String,
}

impl CloudinaryConfig {
    /// Whether all three credentials are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.cloud_name.is_some() && self.api_key.is_some() && self.api_secret.is_some()
    }
}

/// Full server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listening address.
    pub bind: SocketAddr,
    /// Image host credentials.
    pub cloudinary: CloudinaryConfig,
    /// remove.bg API key, when configured.
    pub remove_bg_api_key: Option<String>,
    /// remove.bg endpoint.
    pub remove_bg_url: String,
    /// Ollama host.
    pub ollama_host: String,
    /// Ollama model.
    pub ollama_model: String,
    /// Outbound request timeout.
    pub request_timeout: Duration,
    /// Export size target in kilobytes.
    pub export_target_kb: usize,
    /// Allowed CORS origins; empty allows any.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            cloudinary: CloudinaryConfig {
                api_url: DEFAULT_CLOUDINARY_API.to_string(),
                ..CloudinaryConfig::default()
            },
            remove_bg_api_key: None,
            remove_bg_url: DEFAULT_REMOVE_BG_URL.to_string(),
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            export_target_kb: DEFAULT_EXPORT_TARGET_KB,
            allowed_origins: Vec::new(),
        }
    }
}

/// Blank values count as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<CliArgs> for ServerConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            bind: SocketAddr::new(args.host, args.port),
            cloudinary: CloudinaryConfig {
                cloud_name: non_empty(args.cloudinary_cloud_name),
                api_key: non_empty(args.cloudinary_api_key),
                api_secret: non_empty(args.cloudinary_api_secret),
                api_url: args.cloudinary_api_url,
            },
            remove_bg_api_key: non_empty(args.remove_bg_api_key),
            remove_bg_url: args.remove_bg_url,
            ollama_host: args.ollama_host,
            ollama_model: args.ollama_model,
            request_timeout: Duration::from_secs(args.request_timeout_secs),
            export_target_kb: args.export_target_kb,
            allowed_origins: args
                .allowed_origins
                .into_iter()
                .filter(|o| !o.trim().is_empty())
                .collect(),
        }
    }
}
