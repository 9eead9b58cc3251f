//! Tile Route Planner Backend
//!
//! A REST server that owns a tile-delivery driver's route: stop list
//! management, delivery slip OCR, route optimization, and export to
//! Google Maps or plain text.

use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tile_route_backend::api;
use tile_route_backend::config::Config;
use tile_route_backend::ocr::MAX_IMAGE_BYTES;
use tile_route_backend::state::{AppState, SharedState};
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Room for multipart framing around the image itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    message: String,
}

/// Request ID middleware - adds unique ID to each request for tracing
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}

fn build_router(app_state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        // Stop list
        .route(
            "/api/stops",
            get(api::stops::list_stops).post(api::stops::create_stop),
        )
        .route("/api/stops/reorder", post(api::stops::reorder_stops))
        .route(
            "/api/stops/:id",
            put(api::stops::update_stop).delete(api::stops::delete_stop),
        )
        .route("/api/stops/:id/toggle", post(api::stops::toggle_stop))
        // Route settings and optimization
        .route("/api/route/optimize", post(api::route::optimize_route))
        .route(
            "/api/route/departure-time",
            get(api::route::get_departure_time).put(api::route::set_departure_time),
        )
        // Slip OCR
        .route(
            "/api/ocr",
            post(api::ocr::upload_slip)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route(
            "/api/ocr/staged",
            get(api::ocr::get_staged).delete(api::ocr::discard_staged),
        )
        .route("/api/ocr/commit", post(api::ocr::commit_staged))
        // Export
        .route(
            "/api/export/navigation",
            get(api::export::navigation_link),
        )
        .route("/api/export/text", get(api::export::plain_text))
        // Middleware (order matters - request_id should be first)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive()) // Allow CORS for development
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load configuration
    let config = Config::from_env();
    info!("Configuration loaded: {:?}", config);

    // Initialize application state from the snapshot or defaults
    let app_state = AppState::from_config(&config);
    info!(
        stops = app_state.route().len(),
        optimizer = app_state.optimizer.name(),
        data_dir = %config.persistence.data_dir.display(),
        "Route loaded"
    );
    let app_state = Arc::new(RwLock::new(app_state));

    let app = build_router(app_state);

    // Bind to address from config
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    info!("🚀 Server running on http://{}", addr);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Setup graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "Route planner backend is healthy".to_string(),
    })
}
