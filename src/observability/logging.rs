//! Structured logging setup.
//!
//! `RUST_LOG` wins; otherwise the configured level applies to this crate and
//! to tower-http's request traces.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Default filter directive for a level such as `info`.
pub fn default_directive(level: &str) -> String {
    format!("folio_edge={level},tower_http={level}")
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(&config.log_level).into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_covers_crate_and_http_traces() {
        assert_eq!(default_directive("debug"), "folio_edge=debug,tower_http=debug");
    }
}
