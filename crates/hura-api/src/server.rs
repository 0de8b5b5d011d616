//! HTTP API Server
//!
//! Builds the axum app and serves it until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use hura_core::{Backends, Config, QueryRouter};
use hura_whatsapp::{WebhookState, WhatsAppService};

use crate::middleware::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::routes::routes;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub router: QueryRouter,
    pub whatsapp: Option<Arc<WhatsAppService>>,
}

impl AppState {
    pub fn new(config: Config, backends: Backends, whatsapp: Option<Arc<WhatsAppService>>) -> Self {
        Self {
            config: Arc::new(config),
            router: QueryRouter::new(backends),
            whatsapp,
        }
    }

    pub fn backends(&self) -> &Backends {
        self.router.backends()
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    match &config.server.allowed_origins {
        Some(origins) if !origins.is_empty() => {
            let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            layer.allow_origin(origins)
        }
        _ => layer.allow_origin(Any),
    }
}

/// Assemble routes, the WhatsApp webhook and middleware
pub fn build_app(state: AppState, webhook: WebhookState, limiter: Arc<RateLimiter>) -> Router {
    let cors = cors_layer(&state.config);

    routes()
        .with_state(state)
        .merge(hura_whatsapp::router(webhook))
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the HTTP API server
pub async fn start_server(
    state: AppState,
    webhook: WebhookState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let host = state.config.server.host.clone();
    let port = state.config.server.port;

    let limiter = Arc::new(RateLimiter::new(state.config.server.rate_limit_per_minute));
    limiter.clone().start_cleanup_task(Duration::from_secs(300));

    let app = build_app(state, webhook, limiter);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!("HTTP API listening on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP API stopped");
    Ok(())
}
