//! Preview and deploy webhooks.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use super::middleware::AuthUser;
use super::{api_error, ApiError, JsonBody};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookBody {
    #[serde(default)]
    pub content_ref: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookResponse {
    pub content_ref: String,
    pub triggered: bool,
}

fn content_ref(body: HookBody) -> Result<String, ApiError> {
    body.content_ref
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Content reference is required"))
}

/// Ask the hosting provider to build a preview of a content record.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    AuthUser(email): AuthUser,
    JsonBody(body): JsonBody<HookBody>,
) -> Result<Json<HookResponse>, ApiError> {
    let content_ref = content_ref(body)?;

    state.site_hooks().preview(&content_ref).await.map_err(|e| {
        error!(content_ref = %content_ref, error = %e, "Preview webhook failed");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(content_ref = %content_ref, editor = %email, "Preview requested");
    Ok(Json(HookResponse {
        content_ref,
        triggered: true,
    }))
}

/// Redeploy the public site.
pub async fn deploy(
    State(state): State<Arc<AppState>>,
    AuthUser(email): AuthUser,
    JsonBody(body): JsonBody<HookBody>,
) -> Result<Json<HookResponse>, ApiError> {
    let content_ref = content_ref(body)?;

    state.site_hooks().deploy(&content_ref).await.map_err(|e| {
        error!(content_ref = %content_ref, error = %e, "Deploy webhook failed");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(content_ref = %content_ref, editor = %email, "Deploy requested");
    Ok(Json(HookResponse {
        content_ref,
        triggered: true,
    }))
}
