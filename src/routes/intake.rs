//! Intake quarantine route handlers

use crate::error::{ApiResult, AppError};
use crate::quarantine::{IntakeStatus, TrustTier, UpsertIntakeItem};
use crate::state::SharedState;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteRequest {
    pub trust_tier: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    pub reason: String,
}

/// Ingest or update an item. New items always land quarantined at T0,
/// whatever the caller claims about them.
pub async fn upsert_item(
    State(state): State<SharedState>,
    Json(payload): Json<UpsertIntakeItem>,
) -> ApiResult<Json<serde_json::Value>> {
    let item = state.quarantine.upsert(payload).await?;
    Ok(Json(json!({
        "success": true,
        "item": item,
    })))
}

/// List items, optionally filtered by status
pub async fn list_items(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => Some(parse_status(raw)?),
    };
    let items = state.quarantine.list(status).await;
    let backlog = state.quarantine.backlog().await;
    Ok(Json(json!({
        "success": true,
        "count": items.len(),
        "backlog": backlog,
        "items": items,
    })))
}

/// Fetch one item
pub async fn get_item(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let item = state
        .quarantine
        .get(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Intake item '{}' not found", id)))?;
    Ok(Json(json!({
        "success": true,
        "item": item,
    })))
}

/// Promote a quarantined item to CLEAN with an assessed trust tier
pub async fn promote_item(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<PromoteRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let tier = TrustTier::parse(&payload.trust_tier).ok_or_else(|| {
        AppError::Validation(format!("Unknown trust tier '{}'", payload.trust_tier))
    })?;
    let item = state.quarantine.promote_to_clean(&id, tier).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Item '{}' promoted to CLEAN at {:?}", id, tier),
        "item": item,
    })))
}

/// Reject a quarantined item with a recorded reason
pub async fn reject_item(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<RejectRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let item = state.quarantine.reject(&id, &payload.reason).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Item '{}' rejected", id),
        "item": item,
    })))
}

fn parse_status(raw: &str) -> Result<IntakeStatus, AppError> {
    match raw.to_ascii_uppercase().as_str() {
        "QUARANTINE" => Ok(IntakeStatus::Quarantine),
        "CLEAN" => Ok(IntakeStatus::Clean),
        "REJECTED" => Ok(IntakeStatus::Rejected),
        other => Err(AppError::Validation(format!(
            "Unknown intake status '{}'",
            other
        ))),
    }
}
