//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Unknown paths get a JSON 404 in the same shape as other API errors
async fn fallback_handler(uri: axum::http::Uri) -> impl IntoResponse {
    let body = serde_json::json!({
        "error": format!("No route for {}", uri.path()),
        "kind": "NotFound",
    });

    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "application/json")],
        Body::from(body.to_string()),
    )
        .into_response()
}

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Token queries
        .route("/api/token", get(handlers::get_token_info))
        .route("/api/supply", get(handlers::get_supply))
        .route("/api/balances/{address}", get(handlers::get_balance))
        .route("/api/allowance", get(handlers::get_allowance))
        .route("/api/events", get(handlers::get_events))
        .route("/api/events/{sequence}", get(handlers::get_event))
        .route("/api/audit", get(handlers::get_audit))
        // Custody
        .route("/api/deposit", post(handlers::deposit))
        .route("/api/receive", post(handlers::receive))
        .route("/api/withdraw", post(handlers::withdraw))
        // Transfers
        .route("/api/transfer", post(handlers::transfer))
        .route("/api/approve", post(handlers::approve))
        .route("/api/transferFrom", post(handlers::transfer_from))
        .fallback(fallback_handler)
        // Add state and middleware
        .with_state(state)
        .layer(cors)
}

/// Bind `port` on all interfaces and serve until the process exits
pub async fn serve(state: ApiState, port: u16) -> std::io::Result<()> {
    let app = create_router(state);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("API server listening on http://{}", addr);
    axum::serve(listener, app).await
}
