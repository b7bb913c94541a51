//! Gate metrics route handlers

use crate::error::ApiResult;
use crate::metrics::SystemMetrics;
use crate::state::SharedState;
use axum::extract::State;
use axum::Json;
use serde_json::json;

/// Current gate inputs
pub async fn get_metrics(State(state): State<SharedState>) -> ApiResult<Json<serde_json::Value>> {
    let metrics = state.metrics.get().await;
    Ok(Json(json!({
        "success": true,
        "metrics": metrics,
    })))
}

/// Replace the gate inputs. Whole-document replace; missing fields fall
/// back to the restrictive defaults rather than the previous values.
pub async fn set_metrics(
    State(state): State<SharedState>,
    Json(payload): Json<SystemMetrics>,
) -> ApiResult<Json<serde_json::Value>> {
    let metrics = state.metrics.set(payload).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Metrics updated",
        "metrics": metrics,
    })))
}
