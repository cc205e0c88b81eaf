//! Route handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::content::ContentItem;
use crate::http::error::{render_for_path, ApiError, EdgeError};
use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /api/textes`
pub async fn list_textes(
    State(state): State<AppState>,
) -> Result<Json<Arc<Vec<ContentItem>>>, ApiError> {
    Ok(Json(state.content.list().await?))
}

/// `GET /api/texte/{slug}`
pub async fn get_texte(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ContentItem>, ApiError> {
    let slug = slug.trim();
    if slug.is_empty() {
        return Err(EdgeError::Validation("Missing slug".into()).into());
    }

    match state.content.find(slug).await? {
        Some(item) => Ok(Json(item)),
        None => Err(EdgeError::NotFound("Texte not found".into()).into()),
    }
}

/// `GET /api/texte/` with nothing after the slash.
pub async fn missing_slug() -> ApiError {
    EdgeError::Validation("Missing slug".into()).into()
}

/// `GET /api/image/{url}`, where `url` is the percent-encoded absolute URL.
pub async fn proxy_image(State(state): State<AppState>, Path(url): Path<String>) -> Response {
    match state.images.fetch(&url).await {
        Ok(image) => image.into_response(),
        Err(err) => {
            tracing::info!(url = %url, status = err.status().as_u16(), reason = err.kind(), "Image proxy refused");
            err.into_response()
        }
    }
}

/// `GET /api/image` or `/api/image/` without a target.
pub async fn missing_image_url() -> EdgeError {
    EdgeError::Validation("Missing image URL".into())
}

/// Everything that is not an API route: static files.
pub async fn static_fallback(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let path = uri.path();

    if path.starts_with("/api/") || path == "/api" {
        return render_for_path("/api/", EdgeError::NotFound("Not found".into()));
    }
    if method != Method::GET && method != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    match state.statics.load(path).await {
        Ok((file, bytes)) => {
            ([(header::CONTENT_TYPE, file.content_type)], bytes).into_response()
        }
        Err(err) => {
            tracing::debug!(path = %path, status = err.status().as_u16(), "Static file refused");
            err.into_response()
        }
    }
}
