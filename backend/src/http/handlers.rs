//! HTTP handlers for the REST API.
//!
//! Each handler parses its inputs, delegates to the service layer, and wraps
//! the result in a DTO.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::Value;

use super::dto::{EventResponse, EventsResponse, UsersDebugResponse};
use super::error::AppError;
use super::state::AppState;
use crate::api::DocumentId;
use crate::auth::Session;
use crate::config::EnvConfig;
use crate::services::{
    self, build_health_report, list_debug_users, parse_create_payload, parse_patch_payload,
    BuildInfo, EnvStatus, EventListQuery, MAX_EVENTS,
};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

fn parse_path_id(raw: &str, label: &str) -> Result<DocumentId, AppError> {
    DocumentId::parse_str(raw).map_err(|_| {
        tracing::warn!(value = %raw, "invalid {} provided", label);
        AppError::bad_request(format!("Invalid {}", label))
    })
}

fn parse_json_body(body: &Bytes) -> Result<Value, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(error = %e, "invalid JSON payload");
        AppError::bad_request("Invalid JSON payload")
    })
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /api/healthz
///
/// 200 when both the environment and the database are healthy, 503 otherwise.
/// The body is the same in both cases.
pub async fn healthz(State(state): State<AppState>) -> Response {
    let env = EnvStatus::from_result(&EnvConfig::from_env());
    let report = build_health_report(
        state.repository.as_ref(),
        env,
        BuildInfo::detect(),
        state.uptime(),
    )
    .await;

    let status = if report.ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}

// =============================================================================
// Child Events
// =============================================================================

/// GET /api/children/{child_id}/events?from&to&type
pub async fn list_child_events(
    State(state): State<AppState>,
    Path(child_id): Path<String>,
    Query(query): Query<EventListQuery>,
) -> HandlerResult<EventsResponse> {
    let child_id = parse_path_id(&child_id, "childId")?;
    let filter = query.into_filter(child_id).map_err(AppError::bad_request)?;

    let events = services::list_events(state.repository.as_ref(), &filter).await?;
    Ok(Json(EventsResponse::new(events, MAX_EVENTS)))
}

/// POST /api/children/{child_id}/events
pub async fn create_child_event(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(child_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<EventResponse>), AppError> {
    let child_id = parse_path_id(&child_id, "childId")?;
    let payload = parse_json_body(&body)?;
    let input = parse_create_payload(payload, child_id)?;

    let event = services::create_event(state.repository.as_ref(), input).await?;
    tracing::debug!(user_id = %session.user_id, event_id = %event.id, "event created by session");
    Ok((StatusCode::CREATED, Json(EventResponse { event })))
}

/// PATCH /api/children/{child_id}/events/{event_id}
///
/// Payload shape errors are reported before any storage access.
pub async fn patch_child_event(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path((child_id, event_id)): Path<(String, String)>,
    body: Bytes,
) -> HandlerResult<EventResponse> {
    let child_id = parse_path_id(&child_id, "childId")?;
    let event_id = parse_path_id(&event_id, "eventId")?;
    let payload = parse_json_body(&body)?;
    let patch = parse_patch_payload(payload)?;

    let event =
        services::patch_event(state.repository.as_ref(), child_id, event_id, &patch).await?;
    tracing::debug!(user_id = %session.user_id, event_id = %event.id, "event patched by session");
    Ok(Json(EventResponse { event }))
}

// =============================================================================
// Debug
// =============================================================================

/// GET /api/users/debug
///
/// Answers 404 unless debug endpoints are enabled.
pub async fn users_debug(State(state): State<AppState>) -> HandlerResult<UsersDebugResponse> {
    if !state.debug_endpoints {
        return Err(AppError::NotFound("Not Found".to_string()));
    }

    let users = list_debug_users(state.repository.as_ref()).await?;
    let count = users.len();
    Ok(Json(UsersDebugResponse { users, count }))
}
