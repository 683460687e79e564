//! Content record endpoints backed by the content store.
//!
//! Saves go through the store's retry policy; every outcome feeds the
//! process-wide [`AdaptiveThrottle`](pressroom_core::AdaptiveThrottle),
//! whose advice is returned to the editor so autosave can slow down before
//! the quota runs out.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use pressroom_core::{
    ContentRecord, ContentStoreError, ErrorKind, ProjectIndex, RateLimitSnapshot,
    RateLimitWarning,
};
use tracing::{info, warn};

use super::middleware::AuthUser;
use super::{api_error, ErrorResponse, JsonBody};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateContentBody {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateContentResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub version: i64,
    pub attempts: u32,
    pub rate_limit: Option<RateLimitSnapshot>,
    /// How long the editor should wait before the next autosave.
    pub recommended_delay_ms: u64,
    pub warning: Option<RateLimitWarning>,
}

/// Map a store error onto the HTTP error taxonomy.
fn content_error(e: ContentStoreError) -> Response {
    let status = match e.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::TransientNetwork | ErrorKind::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let mut headers = HeaderMap::new();
    if let ContentStoreError::RateLimited { retry_after } = &e {
        headers.insert(
            axum::http::header::RETRY_AFTER,
            HeaderValue::from(retry_after.as_secs().max(1)),
        );
    }

    (
        status,
        headers,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

fn rate_limit_headers(snapshot: &RateLimitSnapshot) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from(snapshot.remaining),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderValue::from(snapshot.limit),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-reset"),
        HeaderValue::from(snapshot.reset_at.timestamp()),
    );
    headers
}

/// Every story in the project index.
pub async fn list_content(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProjectIndex>, Response> {
    state
        .content_store()
        .list()
        .await
        .map(Json)
        .map_err(content_error)
}

pub async fn get_content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ContentRecord>, Response> {
    state
        .content_store()
        .get(&id)
        .await
        .map(Json)
        .map_err(content_error)
}

/// Replace a content record wholesale.
pub async fn update_content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AuthUser(email): AuthUser,
    JsonBody(record): JsonBody<ContentRecord>,
) -> Result<(HeaderMap, Json<SaveResponse>), Response> {
    let result = state.content_store().update(&id, &record).await;
    let mut throttle = state.throttle().lock().await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            throttle.record_error();
            warn!(
                content_id = %id,
                editor = %email,
                delay_ms = throttle.current_delay().as_millis() as u64,
                error = %e,
                "Content save failed"
            );
            return Err(content_error(e));
        }
    };

    let headers = match outcome.rate_limit {
        Some(snapshot) => {
            throttle.observe(snapshot);
            rate_limit_headers(&snapshot)
        }
        None => {
            // Saved without telemetry: nothing to throttle on.
            throttle.reset();
            HeaderMap::new()
        }
    };

    info!(
        content_id = %id,
        editor = %email,
        version = record.version,
        attempts = outcome.attempts,
        "Content saved"
    );

    Ok((
        headers,
        Json(SaveResponse {
            version: record.version,
            attempts: outcome.attempts,
            rate_limit: outcome.rate_limit,
            recommended_delay_ms: throttle.current_delay().as_millis() as u64,
            warning: throttle.warning(),
        }),
    ))
}

/// Create an empty record for a new story.
pub async fn create_content(
    State(state): State<Arc<AppState>>,
    AuthUser(email): AuthUser,
    JsonBody(body): JsonBody<CreateContentBody>,
) -> Result<(StatusCode, Json<CreateContentResponse>), Response> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Story name is required").into_response());
    }

    let id = state
        .content_store()
        .create(name)
        .await
        .map_err(content_error)?;

    info!(content_id = %id, editor = %email, name = %name, "Content record created");
    Ok((StatusCode::CREATED, Json(CreateContentResponse { id })))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use pressroom_core::{ContentRecord, ContentStoreError};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::api::create_router;
    use crate::state::test_support::{test_app, TestApp, TOKEN_AUTH};

    async fn json_body(response: Response) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    async fn harness_with_story() -> TestApp {
        let harness = test_app(TOKEN_AUTH);
        harness
            .content
            .insert("gist-1", ContentRecord::empty("Harbour"))
            .await;
        harness
    }

    fn save_request(id: &str, version: i64) -> Request<Body> {
        let body = json!({
            "version": version,
            "storyName": "Harbour",
            "theme": {"accent": "#0a5"},
            "data": [{"type": "text", "body": "Low tide"}]
        });
        Request::builder()
            .method("PATCH")
            .uri(format!("/api/v1/content/{}", id))
            .header(header::AUTHORIZATION, "Bearer editor-token")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_content() {
        let harness = harness_with_story().await;
        let app = create_router(harness.state);

        let request = Request::builder()
            .uri("/api/v1/content/gist-1")
            .header(header::AUTHORIZATION, "Bearer editor-token")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["storyName"], "Harbour");
        assert_eq!(body["version"], 0);
    }

    #[tokio::test]
    async fn test_get_missing_content_is_not_found() {
        let harness = test_app(TOKEN_AUTH);
        let app = create_router(harness.state);

        let request = Request::builder()
            .uri("/api/v1/content/nope")
            .header(header::AUTHORIZATION, "Bearer editor-token")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_save_returns_rate_limit_headers_and_baseline_delay() {
        let harness = harness_with_story().await;
        let app = create_router(harness.state);

        let response = app.oneshot(save_request("gist-1", 3)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "5000");
        assert_eq!(response.headers()["x-ratelimit-limit"], "5000");
        assert!(response.headers().contains_key("x-ratelimit-reset"));

        let body = json_body(response).await;
        assert_eq!(body["version"], 3);
        assert_eq!(body["attempts"], 1);
        assert_eq!(body["recommendedDelayMs"], 30_000);
        assert!(body["warning"].is_null());

        let stored = harness.content.record("gist-1").await.unwrap();
        assert_eq!(stored.version, 3);
        assert_eq!(stored.data.len(), 1);
    }

    #[tokio::test]
    async fn test_save_near_quota_slows_down_and_warns() {
        let harness = harness_with_story().await;
        harness.content.set_remaining(250).await;
        let app = create_router(harness.state);

        let response = app.oneshot(save_request("gist-1", 1)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["recommendedDelayMs"], 120_000);
        assert_eq!(body["warning"]["level"], "critical");
        assert_eq!(body["warning"]["remaining"], 250);
    }

    #[tokio::test]
    async fn test_save_rate_limited_maps_to_429() {
        let harness = harness_with_story().await;
        harness
            .content
            .set_next_error(ContentStoreError::RateLimited {
                retry_after: Duration::from_secs(7),
            })
            .await;
        let app = create_router(harness.state.clone());

        let response = app.oneshot(save_request("gist-1", 1)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "7");

        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("~7 s"));

        let delay = harness.state.throttle().lock().await.current_delay();
        assert_eq!(delay, Duration::from_millis(60_000));
    }

    #[tokio::test]
    async fn test_save_without_telemetry_resets_throttle() {
        let harness = harness_with_story().await;
        harness
            .content
            .set_next_error(ContentStoreError::RateLimited {
                retry_after: Duration::from_secs(7),
            })
            .await;
        let response = create_router(harness.state.clone())
            .oneshot(save_request("gist-1", 1))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        harness.content.set_report_rate_limit(false).await;
        let response = create_router(harness.state.clone())
            .oneshot(save_request("gist-1", 2))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("x-ratelimit-remaining"));

        let body = json_body(response).await;
        assert_eq!(body["recommendedDelayMs"], 30_000);
        assert!(body["warning"].is_null());
        assert!(body["rateLimit"].is_null());
    }

    #[tokio::test]
    async fn test_save_conflict_after_retries_maps_to_409() {
        let harness = harness_with_story().await;
        harness
            .content
            .set_next_error(ContentStoreError::RetriesExhausted {
                attempts: 5,
                last: Box::new(ContentStoreError::Conflict("gist-1".to_string())),
            })
            .await;
        let app = create_router(harness.state);

        let response = app.oneshot(save_request("gist-1", 1)).await.unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("5 attempts"));
    }

    #[tokio::test]
    async fn test_save_fatal_maps_to_500() {
        let harness = harness_with_story().await;
        harness
            .content
            .set_next_error(ContentStoreError::fatal("HTTP 422: Validation Failed"))
            .await;
        let app = create_router(harness.state);

        let response = app.oneshot(save_request("gist-1", 1)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_create_content() {
        let harness = test_app(TOKEN_AUTH);
        let app = create_router(harness.state);

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/content")
            .header(header::AUTHORIZATION, "Bearer editor-token")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"Harbour"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = json_body(response).await;
        let id = body["id"].as_str().unwrap();
        let record = harness.content.record(id).await.unwrap();
        assert_eq!(record.name, "Harbour");
        assert_eq!(record.version, 0);
    }

    #[tokio::test]
    async fn test_save_with_wrong_field_type_returns_json_error() {
        let harness = harness_with_story().await;
        let app = create_router(harness.state);

        let request = Request::builder()
            .method("PATCH")
            .uri("/api/v1/content/gist-1")
            .header(header::AUTHORIZATION, "Bearer editor-token")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"version":"three","storyName":"Harbour"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("version"));
        assert_eq!(harness.content.record("gist-1").await.unwrap().version, 0);
    }

    #[tokio::test]
    async fn test_created_content_is_listed() {
        let harness = test_app(TOKEN_AUTH);

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/content")
            .header(header::AUTHORIZATION, "Bearer editor-token")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"Harbour"}"#))
            .unwrap();
        let created = json_body(
            create_router(harness.state.clone())
                .oneshot(request)
                .await
                .unwrap(),
        )
        .await;

        let request = Request::builder()
            .uri("/api/v1/content")
            .header(header::AUTHORIZATION, "Bearer editor-token")
            .body(Body::empty())
            .unwrap();
        let response = create_router(harness.state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["projects"][0]["name"], "Harbour");
        assert_eq!(body["projects"][0]["id"], created["id"]);
    }

    #[tokio::test]
    async fn test_list_content_requires_auth() {
        let harness = test_app(TOKEN_AUTH);
        let app = create_router(harness.state);

        let request = Request::builder()
            .uri("/api/v1/content")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_content_requires_name() {
        let harness = test_app(TOKEN_AUTH);
        let app = create_router(harness.state);

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/content")
            .header(header::AUTHORIZATION, "Bearer editor-token")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"  "}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
