//! Statistics and health handlers

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Record counts across the whole store
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    /// Number of users
    pub total_users: i64,
    /// Number of events
    pub total_events: i64,
    /// Number of uploaded files
    pub total_files: i64,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: DateTime<Utc>,
    version: String,
}

/// GET /api/statistics - Count users, events and files
///
/// The three counts run concurrently; any failure fails the request.
pub async fn get_statistics(State(state): State<AppState>) -> Result<Json<Statistics>, AppError> {
    let (total_users, total_events, total_files) = tokio::try_join!(
        state.store.count_users(),
        state.store.count_events(),
        state.store.count_files(),
    )?;

    Ok(Json(Statistics {
        total_users,
        total_events,
        total_files,
    }))
}

/// GET /api/health - Liveness check
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Server is running".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
