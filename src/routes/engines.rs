//! Engine governance route handlers
//!
//! The transition and action-check endpoints are the enforcement surface:
//! a denial comes back as a structured 409 rather than a 200 with a flag,
//! so callers cannot accidentally ignore it.

use crate::engine::states::EngineState;
use crate::error::{ApiResult, AppError};
use crate::state::SharedState;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub engine: String,
    pub target_state: EngineState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckActionRequest {
    pub engine: String,
    pub action: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KillSwitchRequest {
    pub engaged: bool,
}

/// List the engine catalog with each engine's current state
pub async fn list_engines(State(state): State<SharedState>) -> ApiResult<Json<serde_json::Value>> {
    let states = state.engine_store.all_states().await;
    let engines: Vec<_> = state
        .registry
        .list()
        .iter()
        .map(|d| {
            json!({
                "descriptor": d,
                "currentState": states.get(&d.name),
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "engines": engines,
    })))
}

/// Current state of every registered engine
pub async fn list_engine_states(
    State(state): State<SharedState>,
) -> ApiResult<Json<serde_json::Value>> {
    let states = state.engine_store.all_states().await;
    let version = state.engine_store.version().await;
    Ok(Json(json!({
        "success": true,
        "version": version,
        "states": states,
    })))
}

/// Apply a state transition through the full policy pipeline
pub async fn transition(
    State(state): State<SharedState>,
    Json(payload): Json<TransitionRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let outcome = state
        .transitions
        .transition(&payload.engine, payload.target_state)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Engine '{}' moved {} -> {}",
            outcome.engine, outcome.previous_state, outcome.new_state
        ),
        "engine": outcome.engine,
        "previousState": outcome.previous_state,
        "newState": outcome.new_state,
        "policy": outcome.policy,
    })))
}

/// Dry-run the policy gates for a proposed transition without applying it
pub async fn evaluate_transition(
    State(state): State<SharedState>,
    Json(payload): Json<TransitionRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let policy = state
        .transitions
        .evaluate(&payload.engine, payload.target_state)
        .await?;

    Ok(Json(json!({
        "success": true,
        "engine": payload.engine,
        "targetState": payload.target_state,
        "policy": policy,
    })))
}

/// List the known action classes
pub async fn list_actions(State(state): State<SharedState>) -> ApiResult<Json<serde_json::Value>> {
    Ok(Json(json!({
        "success": true,
        "actions": state.registry.list_actions(),
    })))
}

/// Ask the runtime guard whether one action may execute right now.
/// A block surfaces as a 409 with the engine, action, and state attached.
pub async fn check_action(
    State(state): State<SharedState>,
    Json(payload): Json<CheckActionRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let action = state
        .registry
        .get_action(&payload.action)
        .ok_or_else(|| AppError::Validation(format!("Unknown action '{}'", payload.action)))?
        .clone();

    let engine_state = state.guard.enforce(&payload.engine, &action).await?;

    Ok(Json(json!({
        "success": true,
        "allowed": true,
        "engine": payload.engine,
        "action": action.name,
        "state": engine_state,
    })))
}

/// Current kill-switch position
pub async fn kill_switch_status(
    State(state): State<SharedState>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(Json(json!({
        "success": true,
        "engaged": state.kill_switch.is_engaged(),
    })))
}

/// Flip the kill switch
pub async fn set_kill_switch(
    State(state): State<SharedState>,
    Json(payload): Json<KillSwitchRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    state.kill_switch.set(payload.engaged);
    Ok(Json(json!({
        "success": true,
        "message": if payload.engaged {
            "Kill switch engaged; all effectful execution is blocked"
        } else {
            "Kill switch disengaged"
        },
        "engaged": payload.engaged,
    })))
}
