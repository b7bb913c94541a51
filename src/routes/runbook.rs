//! Runbook route handler

use crate::runbook::render_markdown;
use crate::state::SharedState;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub format: Option<String>,
}

/// Current go-live status. `?format=markdown` returns the operator
/// checklist as text instead of JSON. This endpoint never errors.
pub async fn status(
    State(state): State<SharedState>,
    Query(query): Query<StatusQuery>,
) -> Response {
    let status = state.runbook.build().await;

    if query.format.as_deref() == Some("markdown") {
        return (
            [(axum::http::header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            render_markdown(&status),
        )
            .into_response();
    }

    Json(status).into_response()
}
