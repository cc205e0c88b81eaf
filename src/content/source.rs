//! Content source abstraction.

use futures_util::future::BoxFuture;

use crate::content::types::{ContentError, ContentItem};

/// Something that can list publishable items.
///
/// Implementations return items already filtered to publishable ones and
/// ordered freshest first.
pub trait ContentSource: Send + Sync {
    /// Short name used in logs and metrics.
    fn name(&self) -> &'static str;

    fn fetch_items(&self) -> BoxFuture<'_, Result<Vec<ContentItem>, ContentError>>;
}
