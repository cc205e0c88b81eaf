//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge
//! server. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EdgeConfig {
    /// Listener configuration (bind host, port).
    pub listener: ListenerConfig,

    /// Content source and cache settings.
    pub content: ContentConfig,

    /// Image proxy rules.
    pub images: ImageProxyConfig,

    /// Per-client rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Cross-origin allow-list.
    pub cors: CorsConfig,

    /// Static file serving.
    pub statics: StaticConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl EdgeConfig {
    /// Socket address string the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listener.host, self.listener.port)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port.
    pub port: u16,

    /// Total time allowed for a request/response cycle, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            request_timeout_secs: 60,
        }
    }
}

/// Content source configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Integration token for the notes service. Absent means fixtures only.
    pub notion_token: Option<String>,

    /// Database whose pages are published.
    pub notion_database_id: Option<String>,

    /// Base URL of the notes service API.
    pub api_base: String,

    /// Value sent in the `Notion-Version` header.
    pub api_version: String,

    /// How long a fetched list stays fresh, in seconds.
    pub cache_ttl_secs: u64,

    /// Timeout for a single content source call, in seconds.
    pub request_timeout_secs: u64,
}

impl ContentConfig {
    /// Both credentials present and non-empty.
    pub fn has_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.notion_token) && present(&self.notion_database_id)
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            notion_token: None,
            notion_database_id: None,
            api_base: "https://api.notion.com".to_string(),
            api_version: "2022-06-28".to_string(),
            cache_ttl_secs: 300,
            request_timeout_secs: 10,
        }
    }
}

/// Image proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ImageProxyConfig {
    /// Hard ceiling on proxied image size, in bytes.
    pub max_bytes: u64,

    /// Upstream hosts allowed to serve images. Empty means any public host.
    pub allowed_domains: Vec<String>,

    /// Accepted upstream `Content-Type` values.
    pub allowed_content_types: Vec<String>,

    /// Upstream connect timeout, in seconds.
    pub connect_timeout_secs: u64,

    /// Upstream total timeout, in seconds.
    pub request_timeout_secs: u64,

    /// Refuse to connect when a hostname resolves to a private address.
    pub guard_resolved_addresses: bool,

    /// Development only: skip the private-host checks entirely.
    pub allow_private_hosts: bool,
}

impl Default for ImageProxyConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            allowed_domains: Vec::new(),
            allowed_content_types: [
                "image/jpeg",
                "image/jpg",
                "image/png",
                "image/gif",
                "image/webp",
                "image/svg+xml",
                "image/bmp",
                "image/tiff",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
            guard_resolved_addresses: true,
            allow_private_hosts: false,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Length of the fixed window, in seconds.
    pub window_secs: u64,

    /// Maximum requests per client within one window.
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 60,
            max_requests: 100,
        }
    }
}

/// Cross-origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Exact origins (`scheme://host[:port]`) allowed to call the API.
    pub allowed_origins: Vec<String>,

    /// Preflight cache lifetime sent in `Access-Control-Max-Age`.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_age_secs: 86_400,
        }
    }
}

/// Static file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticConfig {
    /// Document root.
    pub root: String,

    /// File served for `/`.
    pub index_file: String,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            root: "public".to_string(),
            index_file: "index.html".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
