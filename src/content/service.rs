//! Cached access to the content list.
//!
//! Fallback chain on every read: fresh cache, then a source refresh, then
//! the last good cache (even if stale), then the bundled fixtures.
//! The cache slot is replaced wholesale. Concurrent refreshes after expiry
//! are not deduplicated.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;

use crate::content::source::ContentSource;
use crate::content::types::ContentItem;
use crate::http::error::EdgeError;
use crate::observability::metrics;

/// A successful fetch and when it happened.
#[derive(Debug)]
pub struct CacheEntry {
    pub items: Arc<Vec<ContentItem>>,
    pub fetched_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.fetched_at) < ttl
    }
}

/// Content list with TTL cache and fallbacks.
pub struct ContentService {
    source: Option<Arc<dyn ContentSource>>,
    fixtures: Option<Arc<Vec<ContentItem>>>,
    cache: ArcSwapOption<CacheEntry>,
    ttl: Duration,
}

impl ContentService {
    pub fn new(
        source: Option<Arc<dyn ContentSource>>,
        fixtures: Option<Vec<ContentItem>>,
        ttl: Duration,
    ) -> Self {
        Self {
            source,
            fixtures: fixtures.map(Arc::new),
            cache: ArcSwapOption::empty(),
            ttl,
        }
    }

    /// All publishable items, freshest first.
    pub async fn list(&self) -> Result<Arc<Vec<ContentItem>>, EdgeError> {
        let Some(source) = &self.source else {
            return self.fixtures_or_error();
        };

        let cached = self.cache.load_full();
        if let Some(entry) = cached.as_ref().filter(|e| e.is_fresh(Instant::now(), self.ttl)) {
            return Ok(entry.items.clone());
        }

        match source.fetch_items().await {
            Ok(items) => {
                let items = Arc::new(items);
                self.cache.store(Some(Arc::new(CacheEntry {
                    items: items.clone(),
                    fetched_at: Instant::now(),
                })));
                Ok(items)
            }
            Err(e) => {
                tracing::error!(source = source.name(), error = %e, "Content refresh failed");
                match cached {
                    Some(entry) => {
                        metrics::record_content_fallback("stale_cache");
                        Ok(entry.items.clone())
                    }
                    None => {
                        metrics::record_content_fallback("fixtures");
                        self.fixtures_or_error()
                    }
                }
            }
        }
    }

    /// Item with exactly this slug.
    pub async fn find(&self, slug: &str) -> Result<Option<ContentItem>, EdgeError> {
        let items = self.list().await?;
        Ok(items.iter().find(|item| item.slug == slug).cloned())
    }

    /// Whether a cache entry exists (fresh or not).
    pub fn has_cache(&self) -> bool {
        self.cache.load().is_some()
    }

    fn fixtures_or_error(&self) -> Result<Arc<Vec<ContentItem>>, EdgeError> {
        self.fixtures
            .clone()
            .ok_or_else(|| EdgeError::Upstream("no content source, cache or fixtures".into()))
    }
}
