use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use sqlx::PgPool;
use tracing::info;

#[derive(Clone)]
struct AppState {
    pool: PgPool,
}

/// Serve the liveness endpoint on the configured port
pub async fn serve(pool: PgPool, port: u16) -> Result<()> {
    let app = Router::new()
        .route("/", get(|| async { "OK" }))
        .route("/health", get(health_handler))
        .with_state(AppState { pool });

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Server running on {}", addr);
    axum::serve(listener, app).await.context("Server error")
}

/// Readiness check: verifies the database pool still answers queries
async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "database": "ok" })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "database": e.to_string() })),
        ),
    }
}
