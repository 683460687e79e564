//! Publish job submission and status polling.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use pressroom_core::{Job, JobError, JobStatus, ProducerError, ProducerMode};
use tracing::{error, info};

use super::middleware::AuthUser;
use super::{api_error, ApiError, JsonBody};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishBody {
    #[serde(default)]
    pub content_ref: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub message: String,
}

/// Submit a publish job; returns as soon as the job is queued.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    AuthUser(email): AuthUser,
    JsonBody(body): JsonBody<PublishBody>,
) -> Result<(StatusCode, Json<PublishResponse>), ApiError> {
    let content_ref = body.content_ref.unwrap_or_default();

    let job = state
        .producer()
        .submit(&content_ref)
        .await
        .map_err(|e| match e {
            ProducerError::MissingContentRef => api_error(StatusCode::BAD_REQUEST, e.to_string()),
            ProducerError::Job(e) => {
                error!(content_ref = %content_ref, error = %e, "Failed to submit publish job");
                api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        })?;

    info!(job_id = %job.id, content_ref = %job.content_ref, editor = %email, "Publish requested");

    let message = match state.producer().mode() {
        ProducerMode::Live => format!(
            "Build started. Poll /api/v1/publish/{} for the download link.",
            job.id
        ),
        ProducerMode::Simulated => "Simulated build scheduled.".to_string(),
    };

    Ok((
        StatusCode::ACCEPTED,
        Json(PublishResponse {
            job_id: job.id,
            status: job.status,
            message,
        }),
    ))
}

/// Current state of a publish job.
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    match state.job_store().get_job(&job_id).await {
        Ok(Some(job)) => Ok(Json(job)),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            JobError::NotFound(job_id).to_string(),
        )),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
