//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::EdgeConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {name}: {value}")]
    Env { name: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file into a configuration, without validating it.
pub fn load_file(path: &Path) -> Result<EdgeConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Build the runtime configuration: defaults, then the optional file, then
/// the environment. The result is validated.
pub fn load_config(path: Option<&Path>) -> Result<EdgeConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_file(path)?,
        None => EdgeConfig::default(),
    };

    apply_env(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` abstracts the environment so tests do not touch process state.
pub fn apply_env<F>(config: &mut EdgeConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = non_empty(lookup("NOTION_TOKEN")) {
        config.content.notion_token = Some(token);
    }
    if let Some(db) = non_empty(lookup("NOTION_DATABASE_ID")) {
        config.content.notion_database_id = Some(db);
    }
    if let Some(origins) = lookup("ALLOWED_ORIGINS") {
        config.cors.allowed_origins = split_list(&origins);
    }
    if let Some(domains) = lookup("ALLOWED_IMAGE_DOMAINS") {
        config.images.allowed_domains = split_list(&domains)
            .into_iter()
            .map(|d| d.to_ascii_lowercase())
            .collect();
    }
    if let Some(port) = non_empty(lookup("PORT")) {
        config.listener.port = port.parse().map_err(|_| ConfigError::Env {
            name: "PORT",
            value: port.clone(),
        })?;
    }
    if let Some(root) = non_empty(lookup("STATIC_ROOT")) {
        config.statics.root = root;
    }

    Ok(())
}

/// Split a comma-separated list, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = EdgeConfig::default();
        apply_env(
            &mut config,
            env(&[
                ("NOTION_TOKEN", "secret"),
                ("NOTION_DATABASE_ID", "abc-123"),
                ("ALLOWED_ORIGINS", "https://a.example, https://b.example ,"),
                ("ALLOWED_IMAGE_DOMAINS", "Images.Example.com"),
                ("PORT", "8088"),
            ]),
        )
        .unwrap();

        assert!(config.content.has_credentials());
        assert_eq!(
            config.cors.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.images.allowed_domains, vec!["images.example.com"]);
        assert_eq!(config.listener.port, 8088);
    }

    #[test]
    fn bad_port_is_reported() {
        let mut config = EdgeConfig::default();
        let err = apply_env(&mut config, env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { name: "PORT", .. }));
    }

    #[test]
    fn blank_credentials_mean_fixtures() {
        let mut config = EdgeConfig::default();
        apply_env(&mut config, env(&[("NOTION_TOKEN", "  ")])).unwrap();
        assert!(!config.content.has_credentials());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rate_limit]\nmax_requests = 5\n\n[listener]\nport = 9000").unwrap();

        let config = load_file(file.path()).unwrap();
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.images.max_bytes, 10 * 1024 * 1024);
    }
}
