//! Published item shape and content errors.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One publishable text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub title: String,
    /// ISO date (`YYYY-MM-DD`) or RFC 3339 timestamp, as provided by the source.
    #[serde(default)]
    pub date: Option<String>,
    pub slug: String,
    #[serde(default)]
    pub content: String,
    /// Absolute URL or empty.
    #[serde(default)]
    pub image: String,
    #[serde(default = "default_published")]
    pub published: bool,
}

fn default_published() -> bool {
    true
}

impl ContentItem {
    /// Parsed date used for ordering. Unparseable or missing dates sort last.
    pub fn sort_key(&self) -> Option<DateTime<Utc>> {
        let raw = self.date.as_deref()?.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    /// Has a title and is not explicitly unpublished.
    pub fn is_publishable(&self) -> bool {
        !self.title.trim().is_empty() && self.published
    }
}

/// Order items freshest first. Stable, so equal dates keep source order.
pub fn sort_freshest_first(items: &mut [ContentItem]) {
    items.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
}

/// Failures talking to the content source.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content source request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("content source returned status {0}")]
    Status(u16),

    #[error("content source response malformed: {0}")]
    Decode(String),

    #[error("fixture dataset invalid: {0}")]
    Fixtures(#[from] serde_json::Error),
}
