//! # Health Handler
//!
//! Liveness endpoint for load balancers and deploy checks.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use sqlx::Row;

use crate::web::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub database: &'static str,
}

/// GET /health
///
/// Reports liveness plus a cheap database connectivity probe. The endpoint
/// itself always answers 200; a broken pool is reported in the body.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match sqlx::query("SELECT 1").fetch_one(&state.db_pool).await {
        Ok(row) => {
            let _: i32 = row.get(0);
            "connected"
        }
        Err(_) => "unavailable",
    };

    Json(HealthResponse {
        status: "healthy",
        service: "taskboard",
        version: env!("CARGO_PKG_VERSION"),
        database,
    })
}
