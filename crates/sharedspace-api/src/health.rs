use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::state::AppState;

/// Liveness probe: reports whether the database answers a trivial query.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let db_state = state.clone();
    let db_status = tokio::task::spawn_blocking(move || match db_state.db.ping() {
        Ok(()) => "connected",
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            "disconnected"
        }
    })
    .await
    .unwrap_or("error");

    Json(json!({
        "status": if db_status == "connected" { "healthy" } else { "unhealthy" },
        "database": db_status,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
