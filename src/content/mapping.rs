//! Mapping of loosely-typed notes pages to [`ContentItem`].
//!
//! Page properties are looked up by an ordered alias list per logical
//! field, compared case-insensitively. The first alias present wins.

use serde_json::{Map, Value};

use crate::content::types::ContentItem;

/// Accepted property names for each logical field, in priority order.
#[derive(Debug, Clone, Copy)]
pub struct FieldAliases {
    pub title: &'static [&'static str],
    pub content: &'static [&'static str],
    pub image: &'static [&'static str],
    pub date: &'static [&'static str],
    pub published: &'static [&'static str],
}

pub const FIELD_ALIASES: FieldAliases = FieldAliases {
    title: &["Titre du texte", "Titre", "title", "Name"],
    content: &["Contenu", "content"],
    image: &["image", "image webflow", "cover"],
    date: &["Date d'écriture", "Date d'ecriture", "date"],
    published: &["published", "Publié"],
};

const SLUG_BASE_MAX: usize = 40;
const SLUG_SUFFIX_LEN: usize = 12;

/// Find the first property matching one of `aliases`.
pub fn find_prop<'a>(props: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        let alias = alias.to_lowercase();
        props
            .iter()
            .find(|(key, _)| key.to_lowercase() == alias)
            .map(|(_, value)| value)
    })
}

/// Plain text of a `title`, `rich_text`, `url` or `files` property.
pub fn prop_text(prop: &Value) -> String {
    match prop.get("type").and_then(Value::as_str) {
        Some(kind @ ("title" | "rich_text")) => prop
            .get(kind)
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("plain_text").and_then(Value::as_str))
                    .collect::<String>()
            })
            .unwrap_or_default(),
        Some("url") => prop
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Some("files") => prop
            .get("files")
            .and_then(Value::as_array)
            .and_then(|files| files.first())
            .and_then(file_url)
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// URL of an `external` or hosted `file` object.
fn file_url(file: &Value) -> Option<String> {
    let url = match file.get("type").and_then(Value::as_str) {
        Some("external") => file.pointer("/external/url"),
        Some("file") => file.pointer("/file/url"),
        _ => None,
    }
    .or_else(|| file.get("url"));

    url.and_then(Value::as_str)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}

/// Start of a `date` property.
pub fn prop_date(prop: &Value) -> Option<String> {
    if prop.get("type").and_then(Value::as_str) != Some("date") {
        return None;
    }
    prop.pointer("/date/start")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Checkbox value; anything else (including absence) counts as published.
pub fn prop_published(prop: Option<&Value>) -> bool {
    match prop {
        Some(p) if p.get("type").and_then(Value::as_str) == Some("checkbox") => {
            p.get("checkbox").and_then(Value::as_bool) == Some(true)
        }
        _ => true,
    }
}

/// Slug from a title plus a suffix taken from a stable id.
///
/// Two items with the same title get different slugs as long as their ids
/// differ in the first 12 characters (dashes ignored).
pub fn make_slug(title: &str, id: Option<&str>) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();
    let base: String = cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .take(SLUG_BASE_MAX)
        .collect();

    let suffix: String = match id.map(|id| id.replace('-', "")).filter(|id| !id.is_empty()) {
        Some(id) => id.chars().take(SLUG_SUFFIX_LEN).collect(),
        None => uuid::Uuid::new_v4().simple().to_string()[..8].to_string(),
    };

    format!("{base}-{suffix}")
}

/// Map a page object. Returns `None` when it has no property map.
pub fn map_page(page: &Value) -> Option<ContentItem> {
    let props = page.get("properties")?.as_object()?;
    let aliases = FIELD_ALIASES;

    let title = find_prop(props, aliases.title)
        .map(prop_text)
        .unwrap_or_default();
    let content = find_prop(props, aliases.content)
        .map(prop_text)
        .unwrap_or_default();
    let date = find_prop(props, aliases.date).and_then(prop_date);
    let published = prop_published(find_prop(props, aliases.published));

    let image = find_prop(props, aliases.image)
        .map(prop_text)
        .filter(|u| !u.is_empty())
        .or_else(|| page.get("cover").and_then(file_url))
        .unwrap_or_default();

    let slug = make_slug(&title, page.get("id").and_then(Value::as_str));

    Some(ContentItem {
        title,
        date,
        slug,
        content,
        image,
        published,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rich(kind: &str, text: &str) -> Value {
        json!({ "type": kind, kind: [{ "plain_text": text }] })
    }

    #[test]
    fn alias_lookup_is_case_insensitive_and_ordered() {
        let props = json!({
            "titre": rich("title", "second choice"),
            "TITRE DU TEXTE": rich("title", "first choice"),
        });
        let props = props.as_object().unwrap();
        let found = find_prop(props, FIELD_ALIASES.title).unwrap();
        assert_eq!(prop_text(found), "first choice");
    }

    #[test]
    fn text_extraction() {
        let multi = json!({
            "type": "rich_text",
            "rich_text": [{ "plain_text": "Hello, " }, { "plain_text": "world" }]
        });
        assert_eq!(prop_text(&multi), "Hello, world");
        assert_eq!(prop_text(&json!({ "type": "url", "url": "https://x.example/a.png" })), "https://x.example/a.png");
        assert_eq!(
            prop_text(&json!({
                "type": "files",
                "files": [{ "type": "external", "external": { "url": "https://cdn.example/c.jpg" } }]
            })),
            "https://cdn.example/c.jpg"
        );
        assert_eq!(prop_text(&json!({ "type": "number", "number": 3 })), "");
    }

    #[test]
    fn published_defaults_to_true() {
        assert!(prop_published(None));
        assert!(prop_published(Some(&json!({ "type": "select" }))));
        assert!(!prop_published(Some(&json!({ "type": "checkbox", "checkbox": false }))));
        assert!(prop_published(Some(&json!({ "type": "checkbox", "checkbox": true }))));
    }

    #[test]
    fn slug_shape() {
        let slug = make_slug("L'été à Paris, 2023!", Some("1a2b3c4d-5e6f-7081-92a3-b4c5d6e7f809"));
        assert_eq!(slug, "lt-paris-2023-1a2b3c4d5e6f");

        assert_eq!(make_slug("  Hi \t there  ", Some("abcd")), "hi-there-abcd");

        let long = make_slug(&"word ".repeat(20), Some("abc"));
        assert_eq!(long, format!("{}-abc", &"word-".repeat(8)[..40]));
    }

    #[test]
    fn identical_titles_get_distinct_slugs() {
        let a = make_slug("Same title", Some("11111111-2222-3333-4444-555555555555"));
        let b = make_slug("Same title", Some("99999999-8888-7777-6666-555555555555"));
        assert_ne!(a, b);
        assert!(a.starts_with("same-title-"));

        let c = make_slug("Same title", None);
        let d = make_slug("Same title", None);
        assert_ne!(c, d);
    }

    #[test]
    fn maps_page_with_cover_fallback() {
        let page = json!({
            "id": "0123abcd-4567-89ef-0123-456789abcdef",
            "cover": { "type": "external", "external": { "url": "https://img.example/cover.png" } },
            "properties": {
                "Titre du texte": rich("title", "Premier texte"),
                "Contenu": rich("rich_text", "Corps"),
                "Date d'écriture": { "type": "date", "date": { "start": "2024-02-01" } },
                "Publié": { "type": "checkbox", "checkbox": true }
            }
        });
        let item = map_page(&page).unwrap();
        assert_eq!(item.title, "Premier texte");
        assert_eq!(item.content, "Corps");
        assert_eq!(item.date.as_deref(), Some("2024-02-01"));
        assert_eq!(item.image, "https://img.example/cover.png");
        assert_eq!(item.slug, "premier-texte-0123abcd4567");
        assert!(item.published);
    }
}
