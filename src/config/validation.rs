//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and formats.
//! Every problem is reported, not just the first.

use thiserror::Error;
use url::Url;

use crate::config::schema::EdgeConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::new("listener.port", "must be non-zero"));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "listener.request_timeout_secs",
            "must be greater than zero",
        ));
    }
    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::new(
            "rate_limit.window_secs",
            "must be greater than zero",
        ));
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::new(
            "rate_limit.max_requests",
            "must be greater than zero",
        ));
    }
    if config.images.max_bytes == 0 {
        errors.push(ValidationError::new(
            "images.max_bytes",
            "must be greater than zero",
        ));
    }
    if config.images.allowed_content_types.is_empty() {
        errors.push(ValidationError::new(
            "images.allowed_content_types",
            "must list at least one type",
        ));
    }
    if config.content.cache_ttl_secs == 0 {
        errors.push(ValidationError::new(
            "content.cache_ttl_secs",
            "must be greater than zero",
        ));
    }
    if Url::parse(&config.content.api_base).is_err() {
        errors.push(ValidationError::new(
            "content.api_base",
            format!("not a URL: {}", config.content.api_base),
        ));
    }
    for origin in &config.cors.allowed_origins {
        if !is_origin(origin) {
            errors.push(ValidationError::new(
                "cors.allowed_origins",
                format!("not an origin: {origin}"),
            ));
        }
    }
    if config.statics.root.trim().is_empty() {
        errors.push(ValidationError::new("statics.root", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `scheme://host[:port]` with nothing after the authority.
fn is_origin(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some()
                && url.path() == "/"
                && !raw.ends_with('/')
                && url.query().is_none()
                && url.fragment().is_none()
        }
        Err(_) => false,
    }
}
