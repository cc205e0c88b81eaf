//! Cross-origin allow-list for the API.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::CorsConfig;
use crate::http::error::{render_for_path, EdgeError};

const ALLOWED_METHODS: &str = "GET, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type";

/// Result of evaluating an `Origin` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsDecision {
    /// Listed origin; echo it back.
    AllowWithOrigin(String),
    /// No `Origin` header; treated as same-origin.
    AllowNoHeader,
    /// Origin not listed.
    Deny,
}

/// Immutable set of origins allowed to call the API.
#[derive(Debug, Clone)]
pub struct OriginGate {
    allowed: HashSet<String>,
    max_age: HeaderValue,
}

impl OriginGate {
    pub fn new<I, S>(origins: I, max_age_secs: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: origins.into_iter().map(Into::into).collect(),
            max_age: HeaderValue::from(max_age_secs),
        }
    }

    pub fn from_config(config: &CorsConfig) -> Self {
        Self::new(config.allowed_origins.iter().cloned(), config.max_age_secs)
    }

    pub fn evaluate(&self, origin: Option<&str>) -> CorsDecision {
        match origin {
            None => CorsDecision::AllowNoHeader,
            Some(origin) if self.allowed.contains(origin) => {
                CorsDecision::AllowWithOrigin(origin.to_string())
            }
            Some(_) => CorsDecision::Deny,
        }
    }

    /// Add the allow-origin header set for an accepted origin.
    pub fn apply_headers(&self, headers: &mut HeaderMap, origin: &str) {
        let Ok(value) = HeaderValue::from_str(origin) else {
            return;
        };
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
        headers.append(header::VARY, HeaderValue::from_static("origin"));
    }
}

/// Read the `Origin` header. A header that is not valid text counts as a
/// foreign origin.
pub fn origin_of(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::ORIGIN)
        .map(|v| v.to_str().unwrap_or("\u{fffd}"))
}

/// Middleware enforcing the allow-list on API paths.
pub async fn cors_middleware(
    State(gate): State<Arc<OriginGate>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !request.uri().path().starts_with("/api/") {
        return next.run(request).await;
    }

    match gate.evaluate(origin_of(request.headers())) {
        CorsDecision::AllowNoHeader => next.run(request).await,
        CorsDecision::AllowWithOrigin(origin) => {
            let mut response = next.run(request).await;
            gate.apply_headers(response.headers_mut(), &origin);
            response
        }
        CorsDecision::Deny => {
            tracing::warn!(
                origin = ?request.headers().get(header::ORIGIN),
                path = %request.uri().path(),
                "Origin not allowed"
            );
            render_for_path(
                request.uri().path(),
                EdgeError::Forbidden("origin not allowed".into()),
            )
            .into_response()
        }
    }
}

/// Answer `OPTIONS` with an empty 200 before any other gate runs.
///
/// Allow-origin headers are attached only when the origin is listed.
pub async fn preflight_middleware(
    State(gate): State<Arc<OriginGate>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() != Method::OPTIONS {
        return next.run(request).await;
    }

    let mut response = StatusCode::OK.into_response();
    if let CorsDecision::AllowWithOrigin(origin) = gate.evaluate(origin_of(request.headers())) {
        gate.apply_headers(response.headers_mut(), &origin);
    }
    response
}
