pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use learnflow_core::Transport;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::services::sessions::SessionStore;
use crate::services::upstream::UpstreamClient;

/// Longest a pronunciation clip may wait for its score before it counts as zero.
pub const DEFAULT_SCORING_TIMEOUT: Duration = Duration::from_secs(20);

/// How often expired sessions are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub upstream: Arc<dyn Transport>,
    pub session_seed: Option<u64>,
    pub scoring_timeout: Duration,
}

impl AppState {
    pub fn new(upstream: Arc<dyn Transport>, session_seed: Option<u64>) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new()),
            upstream,
            session_seed,
            scoring_timeout: DEFAULT_SCORING_TIMEOUT,
        }
    }

    pub fn with_scoring_timeout(mut self, timeout: Duration) -> Self {
        self.scoring_timeout = timeout;
        self
    }
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    let session_routes = Router::new()
        .route("/", post(routes::sessions::create))
        .route(
            "/:id",
            get(routes::sessions::get).delete(routes::sessions::delete),
        )
        .route(
            "/:id/translation/choose",
            post(routes::exercises::choose_option),
        )
        .route(
            "/:id/translation/skip",
            post(routes::exercises::skip_translation),
        )
        .route("/:id/spelling", post(routes::exercises::submit_spelling))
        .route(
            "/:id/pronunciation/start",
            post(routes::exercises::start_recording),
        )
        .route(
            "/:id/pronunciation/stop",
            post(routes::exercises::stop_recording),
        )
        .route("/:id/context/pick", post(routes::exercises::pick_token))
        .route("/:id/matching/select", post(routes::exercises::select_match));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/sessions", session_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tracing::info!("Using vocabulary API at {}", config.upstream_url);
    let upstream = UpstreamClient::new(
        &config.upstream_url,
        config.upstream_token.clone(),
        config.upstream_timeout,
    )?;
    if config.session_seed.is_some() {
        tracing::warn!("SESSION_SEED is set; every session shuffles identically");
    }

    let state = AppState::new(Arc::new(upstream), config.session_seed)
        .with_scoring_timeout(config.upstream_timeout);
    state
        .sessions
        .clone()
        .spawn_sweeper(config.session_ttl, SWEEP_INTERVAL);
    let app = build_router(state);

    let addr = config.addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
