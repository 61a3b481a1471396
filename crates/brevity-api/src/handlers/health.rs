//! Liveness endpoint.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::AppState;

/// Report process liveness and, when attached, database reachability.
///
/// # Returns
/// - 200 OK with `{ status, version, database }`, plus `pool` occupancy
///   when a database is attached
/// - 503 Service Unavailable if the database does not answer
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let pool = state.db.as_ref().map(|db| db.pool_stats());
    if let Some(stats) = pool.filter(|s| s.is_saturated()) {
        tracing::warn!(
            subsystem = "database",
            component = "pool",
            pool_size = stats.size,
            "Connection pool has no idle connections"
        );
    }

    let (status, database) = match &state.db {
        Some(db) => match db.ping().await {
            Ok(()) => (StatusCode::OK, "ok"),
            Err(e) => {
                tracing::error!(subsystem = "api", component = "health", error = %e, "Database ping failed");
                (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
            }
        },
        None => (StatusCode::OK, "not_configured"),
    };

    let mut body = serde_json::json!({
        "status": if status == StatusCode::OK { "healthy" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
    });
    if let Some(stats) = pool {
        body["pool"] = serde_json::json!(stats);
    }
    (status, Json(body))
}
