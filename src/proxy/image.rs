//! SSRF-guarded image proxy.
//!
//! # Order of checks
//! 1. URL parses and uses `http` or `https`
//! 2. Host is not a private/loopback target; IP literals get the same
//!    address check the resolver applies, since they never reach it
//! 3. Host is on the image-domain allow-list, when one is configured
//! 4. One upstream GET; on headers, content type must be an allowed image
//!    type and any declared length must fit the ceiling
//! 5. The body streams through a [`BoundedStream`] so an undeclared or
//!    understated length is still capped
//!
//! Redirects are not followed and failures are never retried.

use std::collections::HashSet;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::Stream;
use reqwest::dns::Resolve;
use url::{Host, Url};

use crate::config::ImageProxyConfig;
use crate::http::error::EdgeError;
use crate::observability::metrics;
use crate::proxy::body::BoundedStream;
use crate::proxy::dns::{is_private_destination, GuardedResolver, SystemResolver};
use crate::security::ssrf::{is_forbidden_host, is_private_addr};

/// Cache directive for proxied images: one year, immutable.
pub const IMAGE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

type UpstreamStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// An upstream image whose headers passed validation.
pub struct ProxiedImage {
    pub content_type: HeaderValue,
    pub content_length: Option<u64>,
    body: BoundedStream<UpstreamStream>,
}

impl IntoResponse for ProxiedImage {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from_stream(self.body));
        *response.status_mut() = StatusCode::OK;

        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, self.content_type);
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(IMAGE_CACHE_CONTROL),
        );
        if let Some(len) = self.content_length {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        }
        response
    }
}

/// Fetches remote images under the configured rules.
#[derive(Debug, Clone)]
pub struct ImageProxy {
    client: reqwest::Client,
    max_bytes: u64,
    allowed_types: Arc<HashSet<String>>,
    allowed_domains: Arc<HashSet<String>>,
    allow_private_hosts: bool,
    guard_addresses: bool,
}

impl ImageProxy {
    pub fn new(config: &ImageProxyConfig) -> Result<Self, reqwest::Error> {
        Self::with_lookup(config, Arc::new(SystemResolver))
    }

    /// Build a proxy whose client resolves names through `lookup`. The
    /// address guard wraps it unless private hosts are allowed.
    pub fn with_lookup<R: Resolve + 'static>(
        config: &ImageProxyConfig,
        lookup: Arc<R>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("folio-edge/", env!("CARGO_PKG_VERSION")));

        let guard_addresses = config.guard_resolved_addresses && !config.allow_private_hosts;
        builder = if guard_addresses {
            builder.dns_resolver(Arc::new(GuardedResolver::new(lookup)))
        } else {
            builder.dns_resolver(lookup)
        };
        if config.allow_private_hosts {
            tracing::warn!("Image proxy allows private hosts; do not use in production");
        }

        Ok(Self {
            client: builder.build()?,
            max_bytes: config.max_bytes,
            allowed_types: Arc::new(
                config
                    .allowed_content_types
                    .iter()
                    .map(|t| t.to_ascii_lowercase())
                    .collect(),
            ),
            allowed_domains: Arc::new(
                config
                    .allowed_domains
                    .iter()
                    .map(|d| d.to_ascii_lowercase())
                    .collect(),
            ),
            allow_private_hosts: config.allow_private_hosts,
            guard_addresses,
        })
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Apply the URL-level rules without touching the network.
    pub fn validate_target(&self, raw: &str) -> Result<Url, EdgeError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(EdgeError::Validation("Missing image URL".into()));
        }

        let url = Url::parse(raw)
            .map_err(|_| EdgeError::Validation(format!("Invalid image URL: {raw}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(EdgeError::Validation(format!("Invalid image URL: {raw}")));
        }

        let host = url
            .host_str()
            .ok_or_else(|| EdgeError::Validation(format!("Invalid image URL: {raw}")))?
            .to_ascii_lowercase();

        if !self.allow_private_hosts && is_forbidden_host(&host) {
            metrics::record_image_rejected("private_host");
            return Err(EdgeError::Forbidden("Image host not allowed".into()));
        }

        let literal = match url.host() {
            Some(Host::Ipv4(ip)) => Some(IpAddr::V4(ip)),
            Some(Host::Ipv6(ip)) => Some(IpAddr::V6(ip)),
            _ => None,
        };
        if self.guard_addresses && literal.is_some_and(is_private_addr) {
            metrics::record_image_rejected("private_address");
            return Err(EdgeError::Forbidden("Image host not allowed".into()));
        }

        if !self.allowed_domains.is_empty() && !self.allowed_domains.contains(&host) {
            metrics::record_image_rejected("domain");
            return Err(EdgeError::Forbidden("Image domain not allowed".into()));
        }

        Ok(url)
    }

    /// Whether a declared `Content-Type` is one of the allowed image types.
    pub fn is_allowed_type(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.allowed_types.contains(&essence)
    }

    /// Validate, fetch, and check headers. The body is returned unread.
    pub async fn fetch(&self, raw: &str) -> Result<ProxiedImage, EdgeError> {
        let url = self.validate_target(raw)?;

        tracing::debug!(url = %url, "Fetching upstream image");

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if is_private_destination(&e) {
                metrics::record_image_rejected("private_address");
                EdgeError::Forbidden("Image host not allowed".into())
            } else {
                EdgeError::Upstream(format!("image fetch {url}: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EdgeError::Upstream(format!(
                "image fetch {url}: upstream status {status}"
            )));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .filter(|v| v.to_str().is_ok_and(|ct| self.is_allowed_type(ct)))
            .cloned()
            .ok_or_else(|| {
                metrics::record_image_rejected("content_type");
                EdgeError::Forbidden("Upstream content is not an allowed image type".into())
            })?;

        let content_length = response.content_length();
        if content_length.is_some_and(|len| len > self.max_bytes) {
            metrics::record_image_rejected("too_large_declared");
            return Err(EdgeError::PayloadTooLarge {
                max: self.max_bytes,
            });
        }

        let stream: UpstreamStream = Box::pin(response.bytes_stream());
        Ok(ProxiedImage {
            content_type,
            content_length,
            body: BoundedStream::new(stream, self.max_bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy(domains: &[&str]) -> ImageProxy {
        let config = ImageProxyConfig {
            allowed_domains: domains.iter().map(|d| d.to_string()).collect(),
            ..ImageProxyConfig::default()
        };
        ImageProxy::new(&config).unwrap()
    }

    #[test]
    fn rejects_bad_urls() {
        let p = proxy(&[]);
        for raw in ["", "not a url", "ftp://example.com/a.png", "file:///etc/passwd", "javascript:alert(1)"] {
            assert!(
                matches!(p.validate_target(raw), Err(EdgeError::Validation(_))),
                "{raw}"
            );
        }
    }

    #[test]
    fn rejects_private_hosts() {
        let p = proxy(&[]);
        for raw in [
            "http://127.0.0.1/a.png",
            "http://localhost:8080/a.png",
            "https://10.1.2.3/a.png",
            "http://[::1]/a.png",
            "http://0x7f.0.0.1/a.png",
            "http://169.254.169.254/latest/meta-data",
            "http://[fd00::1]/a.png",
            "http://[::ffff:10.0.0.1]/a.png",
        ] {
            assert!(
                matches!(p.validate_target(raw), Err(EdgeError::Forbidden(_))),
                "{raw}"
            );
        }
    }

    #[test]
    fn domain_allow_list() {
        let p = proxy(&["images.example.com"]);
        assert!(p.validate_target("https://images.example.com/a.png").is_ok());
        assert!(p.validate_target("https://IMAGES.example.com/a.png").is_ok());
        assert!(matches!(
            p.validate_target("https://cdn.example.com/a.png"),
            Err(EdgeError::Forbidden(_))
        ));
    }

    #[test]
    fn public_url_without_allow_list() {
        let p = proxy(&[]);
        let url = p.validate_target("https://example.com/cover.webp").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn content_type_set() {
        let p = proxy(&[]);
        for ct in ["image/png", "image/JPEG", "image/svg+xml", "image/webp; charset=binary"] {
            assert!(p.is_allowed_type(ct), "{ct}");
        }
        for ct in ["text/html", "image/x-icon", "application/octet-stream", ""] {
            assert!(!p.is_allowed_type(ct), "{ct}");
        }
    }
}
