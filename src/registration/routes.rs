//! REST endpoints driving one registration attempt.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use super::draft::DraftField;
use super::image::ImageCategory;
use super::manager::RegistrationManager;
use super::role::Role;
use crate::error::{Error, ImageHostError, WorkflowError};

/// Shared state for registration routes.
#[derive(Clone)]
pub struct RegistrationRouteState {
    pub manager: Arc<RegistrationManager>,
}

#[derive(Debug, Deserialize)]
struct FieldUpdate {
    field: DraftField,
    value: String,
}

#[derive(Debug, Deserialize)]
struct UploadParams {
    file_name: Option<String>,
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({"error": message.into()}))).into_response()
}

fn workflow_error(err: WorkflowError) -> Response {
    let status = match err {
        WorkflowError::SubmissionInFlight | WorkflowError::AlreadySubmitted => StatusCode::CONFLICT,
        WorkflowError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    error_body(status, err.to_string())
}

/// GET /api/registration/status
async fn get_status(State(state): State<RegistrationRouteState>) -> impl IntoResponse {
    Json(state.manager.status().await)
}

/// POST /api/registration/roles/{role}/toggle
async fn toggle_role(
    State(state): State<RegistrationRouteState>,
    Path(role): Path<String>,
) -> Response {
    let role: Role = match role.parse() {
        Ok(role) => role,
        Err(e) => return error_body(StatusCode::BAD_REQUEST, e),
    };
    match state.manager.toggle_role(role).await {
        Ok(roles) => Json(serde_json::json!({
            "roles": roles,
            "position": state.manager.position().await,
        }))
        .into_response(),
        Err(e) => workflow_error(e),
    }
}

/// PUT /api/registration/fields
async fn set_field(
    State(state): State<RegistrationRouteState>,
    Json(update): Json<FieldUpdate>,
) -> Response {
    match state.manager.set_field(update.field, update.value).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => workflow_error(e),
    }
}

/// POST /api/registration/advance
///
/// Moves forward, or submits from the terminal step. A failed submission
/// is still a 200: the body carries the normalized message.
async fn advance(State(state): State<RegistrationRouteState>) -> Response {
    match state.manager.advance().await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => workflow_error(e),
    }
}

/// POST /api/registration/retreat
async fn retreat(State(state): State<RegistrationRouteState>) -> Response {
    match state.manager.retreat().await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => workflow_error(e),
    }
}

/// POST /api/registration/abandon
async fn abandon(State(state): State<RegistrationRouteState>) -> Response {
    match state.manager.abandon().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => workflow_error(e),
    }
}

/// POST /api/registration/images/{category}
///
/// Raw image bytes in the body; the resulting URL lands in the draft.
async fn upload_image(
    State(state): State<RegistrationRouteState>,
    Path(category): Path<String>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Response {
    let category: ImageCategory = match category.parse() {
        Ok(c) => c,
        Err(e) => return error_body(StatusCode::BAD_REQUEST, e),
    };
    if body.is_empty() {
        return error_body(StatusCode::BAD_REQUEST, "Image body is empty");
    }
    let file_name = params
        .file_name
        .unwrap_or_else(|| format!("{category}.bin"));

    match state
        .manager
        .attach_image(category, body.to_vec(), &file_name)
        .await
    {
        Ok(url) => Json(serde_json::json!({"url": url})).into_response(),
        Err(Error::Workflow(e)) => workflow_error(e),
        Err(Error::ImageHost(ImageHostError::NotConfigured)) => {
            error_body(StatusCode::NOT_IMPLEMENTED, "Image uploads are not configured")
        }
        Err(e) => {
            tracing::warn!(%category, error = %e, "Image upload failed");
            error_body(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

/// Build the registration REST routes.
pub fn registration_routes(state: RegistrationRouteState) -> Router {
    Router::new()
        .route("/api/registration/status", get(get_status))
        .route("/api/registration/roles/{role}/toggle", post(toggle_role))
        .route("/api/registration/fields", put(set_field))
        .route("/api/registration/advance", post(advance))
        .route("/api/registration/retreat", post(retreat))
        .route("/api/registration/abandon", post(abandon))
        .route("/api/registration/images/{category}", post(upload_image))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
