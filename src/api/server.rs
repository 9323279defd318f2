//! HTTP server implementation for the Storefront Insights API

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::handlers;
use crate::core::AppState;

/// Creates the main application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration - read-only API
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .allow_origin(Any);

    let request_timeout = state.config.server.request_timeout;

    Router::new()
        // Root route
        .route("/", get(handlers::root_handler))

        // Entity data
        .route("/data/:entity_type", get(handlers::get_data))

        // Insights
        .route("/insights/users", get(handlers::user_insights))
        .route("/insights/products", get(handlers::product_insights))
        .route("/insights/transactions", get(handlers::transaction_insights))

        // Snapshot control
        .route("/refresh", post(handlers::refresh))

        // System routes
        .route("/health", get(handlers::health_check))
        .route("/info", get(handlers::system_info))
        .route("/metrics", get(handlers::metrics_handler))

        // Apply middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(cors),
        )
        .with_state(state)
}

/// Start the HTTP server and run until `shutdown` resolves
pub async fn start_server(
    addr: SocketAddr,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    tracing::info!("Starting Storefront Insights API server on {}", addr);

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Health check available at http://{}/health", addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await
}
