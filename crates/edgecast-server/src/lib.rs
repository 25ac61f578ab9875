//! HTTP surface for the edge weather handler.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use edgecast_core::{AppError, Config};
use edgecast_weather::client_ip::{FORWARDED_FOR_HEADER, REAL_IP_HEADER};
use edgecast_weather::{resolve_client_ip, CacheStore, EdgeHandler};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<EdgeHandler>,
    /// `Cache-Control` sent with live (non-fallback) answers
    pub cache_control: HeaderValue,
}

impl AppState {
    pub fn new(handler: Arc<EdgeHandler>, ttl_secs: u64) -> Self {
        Self {
            handler,
            cache_control: HeaderValue::from_str(&format!("public, max-age={}", ttl_secs))
                .unwrap_or_else(|_| HeaderValue::from_static("public, max-age=300")),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// GET /api/weather - Location and weather for the calling client
async fn get_weather(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ip = resolve_client_ip(
        header_str(&headers, REAL_IP_HEADER),
        header_str(&headers, FORWARDED_FOR_HEADER),
        state.handler.default_ip(),
    );

    let body = state.handler.handle(&ip).await;
    let fallback = body.is_fallback();

    let mut response = Json(body).into_response();
    if !fallback {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, state.cache_control.clone());
    }
    response
}

/// GET /health - Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Create the HTTP router, serving `static_dir` for any other path when given
pub fn create_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/api/weather", get(get_weather));

    let router = match static_dir {
        Some(dir) if dir.is_dir() => router.fallback_service(ServeDir::new(dir)),
        _ => router,
    };

    router.layer(cors).with_state(state)
}

/// Build the router for `config` over `store`
///
/// # Errors
/// Returns `AppError::Server` if the upstream HTTP client can't be built.
pub fn app(config: &Config, store: Arc<dyn CacheStore>) -> Result<Router, AppError> {
    let handler = EdgeHandler::from_config(config, store)
        .map_err(|e| AppError::Server(format!("failed to build weather handler: {}", e)))?;
    let state = AppState::new(Arc::new(handler), config.cache.ttl_secs);
    Ok(create_router(state, config.server.static_dir.as_deref()))
}

/// Run the HTTP server until Ctrl-C
///
/// # Errors
/// Bind failures and server I/O errors.
pub async fn run(config: Config, store: Arc<dyn CacheStore>) -> Result<(), AppError> {
    let app = app(&config, store)?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    tracing::info!("HTTP server listening on {}", config.server.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
