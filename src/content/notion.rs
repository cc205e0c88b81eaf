//! Notes-service content source.
//!
//! Lists pages through the search endpoint, keeps those belonging to the
//! configured database, optionally narrows to pages tagged `publiable`, and
//! maps them to [`ContentItem`]s.

use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use crate::config::ContentConfig;
use crate::content::mapping::map_page;
use crate::content::source::ContentSource;
use crate::content::types::{sort_freshest_first, ContentError, ContentItem};

const PAGE_SIZE: u32 = 100;
/// Upper bound on search result pages followed per refresh.
const MAX_PAGES: usize = 10;
const PUBLISH_TAG: &str = "publiable";

/// Client for the notes service search API.
#[derive(Debug, Clone)]
pub struct NotionSource {
    client: reqwest::Client,
    search_url: String,
    token: String,
    api_version: String,
    database_id: String,
}

impl NotionSource {
    /// Build a source from config. Returns `Ok(None)` when credentials are missing.
    pub fn from_config(config: &ContentConfig) -> Result<Option<Self>, ContentError> {
        let (Some(token), Some(database_id)) =
            (config.notion_token.as_deref(), config.notion_database_id.as_deref())
        else {
            return Ok(None);
        };
        if token.trim().is_empty() || database_id.trim().is_empty() {
            return Ok(None);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Some(Self {
            client,
            search_url: format!("{}/v1/search", config.api_base.trim_end_matches('/')),
            token: token.to_string(),
            api_version: config.api_version.clone(),
            database_id: normalize_id(database_id),
        }))
    }

    async fn search_pages(&self) -> Result<Vec<Value>, ContentError> {
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut body = json!({
                "filter": { "property": "object", "value": "page" },
                "page_size": PAGE_SIZE,
            });
            if let Some(c) = &cursor {
                body["start_cursor"] = Value::String(c.clone());
            }

            let response = self
                .client
                .post(&self.search_url)
                .bearer_auth(&self.token)
                .header("Notion-Version", &self.api_version)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(ContentError::Status(status.as_u16()));
            }

            let payload: Value = response.json().await?;
            let results = payload
                .get("results")
                .and_then(Value::as_array)
                .ok_or_else(|| ContentError::Decode("missing results array".into()))?;
            pages.extend(results.iter().cloned());

            cursor = match (
                payload.get("has_more").and_then(Value::as_bool),
                payload.get("next_cursor").and_then(Value::as_str),
            ) {
                (Some(true), Some(next)) => Some(next.to_string()),
                _ => break,
            };
        }

        Ok(pages)
    }

    /// Filter, map and order raw search results.
    pub fn select_items(&self, pages: &[Value]) -> Vec<ContentItem> {
        select_items(&self.database_id, pages)
    }
}

impl ContentSource for NotionSource {
    fn name(&self) -> &'static str {
        "notion"
    }

    fn fetch_items(&self) -> BoxFuture<'_, Result<Vec<ContentItem>, ContentError>> {
        Box::pin(async move {
            let pages = self.search_pages().await?;
            let items = self.select_items(&pages);
            tracing::info!(pages = pages.len(), items = items.len(), "Fetched content");
            Ok(items)
        })
    }
}

fn normalize_id(id: &str) -> String {
    id.trim().replace('-', "").to_ascii_lowercase()
}

fn in_database(page: &Value, database_id: &str) -> bool {
    page.pointer("/parent/database_id")
        .and_then(Value::as_str)
        .is_some_and(|id| normalize_id(id) == database_id)
}

fn has_publish_tag(page: &Value) -> bool {
    page.pointer("/properties/Tags/multi_select")
        .and_then(Value::as_array)
        .is_some_and(|tags| {
            tags.iter()
                .filter_map(|t| t.get("name").and_then(Value::as_str))
                .any(|name| name.eq_ignore_ascii_case(PUBLISH_TAG))
        })
}

/// Keep pages of `database_id`; when any of them is tagged for publishing,
/// keep only the tagged ones. Map, drop unpublishable items, sort.
pub fn select_items(database_id: &str, pages: &[Value]) -> Vec<ContentItem> {
    let in_db: Vec<&Value> = pages.iter().filter(|p| in_database(p, database_id)).collect();

    let tagged: Vec<&Value> = in_db.iter().copied().filter(|p| has_publish_tag(p)).collect();
    let selected = if tagged.is_empty() { in_db } else { tagged };

    let mut items: Vec<ContentItem> = selected
        .into_iter()
        .filter_map(map_page)
        .filter(ContentItem::is_publishable)
        .collect();
    sort_freshest_first(&mut items);
    items
}
