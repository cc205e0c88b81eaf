//! Extension allow-list and content types for static files.

/// Extensions that may be served, with their content types.
const ALLOWED: &[(&str, &str)] = &[
    ("html", "text/html; charset=utf-8"),
    ("js", "text/javascript; charset=utf-8"),
    ("json", "application/json"),
    ("css", "text/css; charset=utf-8"),
    ("svg", "image/svg+xml"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("ico", "image/x-icon"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("ttf", "font/ttf"),
    ("eot", "application/vnd.ms-fontobject"),
];

/// Content type for an allow-listed extension, `None` if not allowed.
pub fn for_allowed_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.to_ascii_lowercase();
    ALLOWED
        .iter()
        .find(|(allowed, _)| *allowed == ext)
        .map(|(_, content_type)| *content_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(for_allowed_extension("PNG"), Some("image/png"));
        assert_eq!(for_allowed_extension("woff2"), Some("font/woff2"));
    }

    #[test]
    fn unlisted_extensions() {
        assert_eq!(for_allowed_extension("txt"), None);
        assert_eq!(for_allowed_extension("env"), None);
    }
}
