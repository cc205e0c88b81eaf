//! Bundled fallback dataset.

use crate::content::types::{sort_freshest_first, ContentError, ContentItem};

const FIXTURES_JSON: &str = include_str!("../../fixtures/textes.json");

/// Parse the bundled fixtures, keeping titled items, freshest first.
pub fn load() -> Result<Vec<ContentItem>, ContentError> {
    parse(FIXTURES_JSON)
}

pub fn parse(raw: &str) -> Result<Vec<ContentItem>, ContentError> {
    let mut items: Vec<ContentItem> = serde_json::from_str(raw)?;
    items.retain(|item| !item.title.trim().is_empty());
    sort_freshest_first(&mut items);
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn bundled_fixtures_parse() {
        let items = load().unwrap();
        assert!(!items.is_empty());
        let slugs: HashSet<_> = items.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs.len(), items.len(), "fixture slugs must be unique");
    }

    #[test]
    fn untitled_entries_are_dropped() {
        let raw = r#"[
            {"title": "", "slug": "empty"},
            {"title": "Kept", "slug": "kept", "date": "2020-01-01"}
        ]"#;
        let items = parse(raw).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].slug, "kept");
    }
}
