//! Governance decision ledger route handlers
//!
//! The ledger is append-only: there is no update or delete surface here,
//! only recording and reading.

use crate::error::{ApiResult, AppError};
use crate::governance::NewDecision;
use crate::state::SharedState;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionQuery {
    pub subject_type: Option<String>,
    pub subject_id: Option<String>,
    pub role: Option<String>,
}

/// Record a new decision
pub async fn record_decision(
    State(state): State<SharedState>,
    Json(payload): Json<NewDecision>,
) -> ApiResult<Json<serde_json::Value>> {
    let decision = state.ledger.record_decision(payload).await?;
    Ok(Json(json!({
        "success": true,
        "decision": decision,
    })))
}

/// List decisions for a subject (oldest first), or by role
pub async fn list_decisions(
    State(state): State<SharedState>,
    Query(query): Query<DecisionQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let decisions = match (&query.subject_type, &query.subject_id, &query.role) {
        (Some(subject_type), Some(subject_id), _) => {
            state.ledger.list_for_subject(subject_type, subject_id).await
        }
        (None, None, Some(role)) => state.ledger.list_by_role(role).await,
        _ => {
            return Err(AppError::Validation(
                "Provide subjectType and subjectId together, or role alone".to_string(),
            ))
        }
    };

    Ok(Json(json!({
        "success": true,
        "count": decisions.len(),
        "decisions": decisions,
    })))
}

/// The most recent final decision for a subject, if any
pub async fn latest_final(
    State(state): State<SharedState>,
    Query(query): Query<DecisionQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let (subject_type, subject_id) = match (&query.subject_type, &query.subject_id) {
        (Some(t), Some(i)) => (t, i),
        _ => {
            return Err(AppError::Validation(
                "subjectType and subjectId are required".to_string(),
            ))
        }
    };

    let decision = state.ledger.latest_final(subject_type, subject_id).await;
    Ok(Json(json!({
        "success": true,
        "decision": decision,
    })))
}

/// Fetch one decision by id
pub async fn get_decision(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let decision = state
        .ledger
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Decision '{}' not found", id)))?;
    Ok(Json(json!({
        "success": true,
        "decision": decision,
    })))
}
