//! Global South Research Repository API Gateway
//!
//! The HTTP face of the paper catalog.
//! Handles:
//! - Listing, browsing and reading papers
//! - Authenticated paper creation
//! - PDF downloads
//! - Per-origin rate limiting
//! - Observability (logging, metrics, request ids)

pub mod handlers;
pub mod middleware;

use axum::{
    extract::{DefaultBodyLimit, FromRef},
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use gsr_common::{
    auth::JwtManager,
    config::AppConfig,
    errors::{AppError, ErrorResponse, Result},
    ObjectStorage, PaperCatalog, PaperStore,
};
use middleware::rate_limit::{create_rate_limiter, OriginRateLimiter};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn PaperStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub catalog: Arc<PaperCatalog>,
    pub jwt: Arc<JwtManager>,
    /// `None` when rate limiting is disabled
    pub rate_limiter: Option<Arc<OriginRateLimiter>>,
}

impl AppState {
    /// Wire the process-lifetime services around the given adapters
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn PaperStore>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Result<Self> {
        let secret = config
            .auth
            .jwt_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "auth.jwt_secret is required".to_string(),
            })?;
        let jwt = Arc::new(JwtManager::new(secret, config.auth.jwt_expiration_secs));

        let rate_limiter = if config.rate_limit.enabled {
            Some(create_rate_limiter(&config.rate_limit)?)
        } else {
            None
        };

        let catalog = Arc::new(PaperCatalog::new(store.clone(), config.listing_ttl()));

        Ok(Self {
            config,
            store,
            storage,
            catalog,
            jwt,
            rate_limiter,
        })
    }
}

/// Periodically drop memoized listings whose TTL ran out. Entries are
/// keyed per filter, so ones nobody reads again would otherwise stay.
pub fn spawn_listing_purger(catalog: Arc<PaperCatalog>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let purged = catalog.purge_expired().await;
            tracing::debug!(purged, "Listing cache purged");
        }
    })
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Rate-limited API routes
    let api_routes = Router::new()
        .route(
            "/papers",
            get(handlers::papers::list_papers).post(handlers::papers::create_paper),
        )
        .route("/papers/browse", get(handlers::papers::browse_papers))
        .route("/papers/{id}", get(handlers::papers::get_paper))
        .route("/papers/{id}/download", get(handlers::papers::download_paper))
        .route("/auth/verify", get(handlers::auth::verify))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit,
        ));

    // Probes are never limited
    let probe_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready));

    let max_body_bytes = state.config.server.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    let routes = api_routes
        .merge(probe_routes)
        .route_layer(from_fn(middleware::metrics::track_metrics));

    Router::new()
        .nest("/v2", routes)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Render a handler panic as the generic internal error body
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");

    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::internal())).into_response()
}
