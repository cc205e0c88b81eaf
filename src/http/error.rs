//! Request-level error taxonomy and its HTTP rendering.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Message returned for every upstream failure. Upstream detail stays in logs.
pub const UPSTREAM_MESSAGE: &str = "Upstream request failed";

/// Errors a request can terminate with.
#[derive(Debug, Error)]
pub enum EdgeError {
    /// Malformed or missing input (URL, slug).
    #[error("{0}")]
    Validation(String),

    /// Refused by a guard: SSRF target, origin, traversal, extension, domain.
    #[error("{0}")]
    Forbidden(String),

    /// Unknown slug or missing file.
    #[error("{0}")]
    NotFound(String),

    /// Image larger than the configured ceiling.
    #[error("Image exceeds {max} bytes")]
    PayloadTooLarge { max: u64 },

    /// Client exceeded its request budget.
    #[error("Too many requests")]
    RateLimited,

    /// Content source or image origin failure. The detail is never rendered.
    #[error("{}", UPSTREAM_MESSAGE)]
    Upstream(String),
}

impl EdgeError {
    pub fn status(&self) -> StatusCode {
        match self {
            EdgeError::Validation(_) => StatusCode::BAD_REQUEST,
            EdgeError::Forbidden(_) => StatusCode::FORBIDDEN,
            EdgeError::NotFound(_) => StatusCode::NOT_FOUND,
            EdgeError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            EdgeError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            EdgeError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used in metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            EdgeError::Validation(_) => "validation",
            EdgeError::Forbidden(_) => "forbidden",
            EdgeError::NotFound(_) => "not_found",
            EdgeError::PayloadTooLarge { .. } => "too_large",
            EdgeError::RateLimited => "rate_limited",
            EdgeError::Upstream(_) => "upstream",
        }
    }

    /// Render as `{"error": ...}`.
    pub fn into_json(self) -> Response {
        ApiError(self).into_response()
    }

    /// Render as plain text.
    pub fn into_text(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

/// JSON rendering for API routes.
#[derive(Debug)]
pub struct ApiError(pub EdgeError);

impl From<EdgeError> for ApiError {
    fn from(err: EdgeError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let EdgeError::Upstream(detail) = &self.0 {
            tracing::error!(error = %detail, "Upstream failure");
        }
        (self.0.status(), Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Plain text rendering for static files and images.
impl IntoResponse for EdgeError {
    fn into_response(self) -> Response {
        if let EdgeError::Upstream(detail) = &self {
            tracing::error!(error = %detail, "Upstream failure");
        }
        self.into_text()
    }
}

/// JSON for content API paths, plain text for images and static files.
pub fn render_for_path(path: &str, err: EdgeError) -> Response {
    if path.starts_with("/api/") && !path.starts_with("/api/image") {
        err.into_json()
    } else {
        err.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(EdgeError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(EdgeError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(EdgeError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            EdgeError::PayloadTooLarge { max: 1 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(EdgeError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            EdgeError::Upstream("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn upstream_detail_is_not_displayed() {
        let err = EdgeError::Upstream("connect ECONNREFUSED 10.0.0.3:443".into());
        assert_eq!(err.to_string(), UPSTREAM_MESSAGE);
    }

    #[tokio::test]
    async fn json_and_text_bodies() {
        let json = render_for_path("/api/texte/x", EdgeError::NotFound("Texte not found".into()));
        assert_eq!(json.headers()[header::CONTENT_TYPE], "application/json");
        let body = axum::body::to_bytes(json.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], br#"{"error":"Texte not found"}"#);

        let text = render_for_path("/img/a.png", EdgeError::NotFound("File not found".into()));
        assert!(text.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
    }
}
