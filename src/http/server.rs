//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the content, image and static services from config
//! - Create the Axum router and wire the edge middleware in order
//! - Bind to a listener and serve until shutdown
//! - Run the rate-limit sweeper alongside the server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::EdgeConfig;
use crate::content::{fixtures, ContentError, ContentService, ContentSource, NotionSource};
use crate::http::handlers;
use crate::http::request::{track_requests, X_REQUEST_ID};
use crate::lifecycle::Shutdown;
use crate::proxy::ImageProxy;
use crate::security::cors::{cors_middleware, preflight_middleware};
use crate::security::headers::with_security_headers;
use crate::security::rate_limit::rate_limit_middleware;
use crate::security::{OriginGate, RateLimiter};
use crate::statics::StaticResolver;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub content: Arc<ContentService>,
    pub images: ImageProxy,
    pub statics: Arc<StaticResolver>,
}

/// Failures while assembling the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build image client: {0}")]
    ImageClient(#[from] reqwest::Error),

    #[error("failed to build content source: {0}")]
    Content(#[from] ContentError),
}

/// The edge server: router plus the background state it owns.
pub struct EdgeServer {
    router: Router,
    config: EdgeConfig,
    limiter: Arc<RateLimiter>,
}

impl EdgeServer {
    /// Create a server from a validated configuration.
    pub fn new(config: EdgeConfig) -> Result<Self, ServerError> {
        let source = NotionSource::from_config(&config.content)?
            .map(|s| Arc::new(s) as Arc<dyn ContentSource>);
        if source.is_none() {
            tracing::warn!("Content credentials missing; serving bundled fixtures");
        }

        let fixtures = match fixtures::load() {
            Ok(items) => Some(items),
            Err(e) => {
                tracing::error!(error = %e, "Bundled fixtures unreadable");
                None
            }
        };

        let state = AppState {
            content: Arc::new(ContentService::new(
                source,
                fixtures,
                Duration::from_secs(config.content.cache_ttl_secs),
            )),
            images: ImageProxy::new(&config.images)?,
            statics: Arc::new(StaticResolver::new(
                &config.statics.root,
                &config.statics.index_file,
            )),
        };

        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
        let gate = Arc::new(OriginGate::from_config(&config.cors));
        let router = build_router(&config, state, limiter.clone(), gate);

        Ok(Self {
            router,
            config,
            limiter,
        })
    }

    /// A copy of the fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            static_root = %self.config.statics.root,
            rate_limit = self.config.rate_limit.enabled,
            "HTTP server starting"
        );

        if self.config.rate_limit.enabled {
            tokio::spawn(self.limiter.clone().run_sweeper(shutdown.subscribe()));
        }

        let mut stop = shutdown.subscribe();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the router. Request flow, outermost first:
///
/// ```text
/// request id → trace → timeout → security headers → OPTIONS → rate limit
///     → origin gate (/api/ only) → metrics → route or static fallback
/// ```
#[allow(deprecated)]
pub fn build_router(
    config: &EdgeConfig,
    state: AppState,
    limiter: Arc<RateLimiter>,
    gate: Arc<OriginGate>,
) -> Router {
    let mut router = Router::new()
        .route("/api/textes", get(handlers::list_textes))
        .route("/api/texte", get(handlers::missing_slug))
        .route("/api/texte/", get(handlers::missing_slug))
        .route("/api/texte/{slug}", get(handlers::get_texte))
        .route("/api/image", get(handlers::missing_image_url))
        .route("/api/image/", get(handlers::missing_image_url))
        .route("/api/image/{*url}", get(handlers::proxy_image))
        .route("/healthz", get(handlers::health))
        .fallback(handlers::static_fallback)
        .with_state(state)
        .layer(middleware::from_fn(track_requests))
        .layer(middleware::from_fn_with_state(gate.clone(), cors_middleware));

    if config.rate_limit.enabled {
        router = router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
    }

    let router = router.layer(middleware::from_fn_with_state(gate, preflight_middleware));

    with_security_headers(router)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.listener.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
}
