use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database_up = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .map_err(|e| {
            tracing::warn!(error = ?e, "Health check could not reach the database");
        })
        .is_ok();

    let (status, database) = if database_up {
        (StatusCode::OK, "up")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "down")
    };
    let body = json!({
        "status": if database_up { "ok" } else { "degraded" },
        "database": database,
    });
    (status, Json(body))
}
