use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_course_manager, require_course_reader, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::LiveSession;
use crate::repositories;
use crate::schemas::live_session::{
    LiveSessionCreate, LiveSessionResponse, LiveSessionStatusUpdate, LiveSessionUpdate,
};
use crate::services::live_session_policy::{check_transition, Transition};

#[derive(Debug, Deserialize)]
pub(crate) struct ListSessionsQuery {
    /// Only scheduled and live sessions.
    #[serde(default)]
    upcoming: bool,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route("/:session_id", get(get_session).patch(update_session).delete(delete_session))
        .route("/:session_id/status", post(change_status))
}

async fn list_sessions(
    Path(course_id): Path<String>,
    Query(params): Query<ListSessionsQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<LiveSessionResponse>>, ApiError> {
    let access = require_course_reader(&state, &user, &course_id).await?;

    let sessions =
        repositories::live_sessions::list_by_course(state.db(), &access.course.id, params.upcoming)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list live sessions"))?;

    Ok(Json(sessions.into_iter().map(LiveSessionResponse::from_db).collect()))
}

async fn create_session(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<LiveSessionCreate>,
) -> Result<(StatusCode, Json<LiveSessionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let course = require_course_manager(&state, &user, &course_id).await?;

    let session = repositories::live_sessions::create(
        state.db(),
        repositories::live_sessions::CreateLiveSession {
            id: &Uuid::new_v4().to_string(),
            course_id: &course.id,
            title: payload.title.trim(),
            description: payload.description.as_deref(),
            scheduled_at: payload.scheduled_at,
            duration_minutes: payload.duration_minutes,
            meeting_url: payload.meeting_url.as_deref(),
            created_by: &user.id,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create live session"))?;

    Ok((StatusCode::CREATED, Json(LiveSessionResponse::from_db(session))))
}

async fn get_session(
    Path((course_id, session_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<LiveSessionResponse>, ApiError> {
    let access = require_course_reader(&state, &user, &course_id).await?;
    let session = load_session(&state, &access.course.id, &session_id).await?;
    Ok(Json(LiveSessionResponse::from_db(session)))
}

async fn update_session(
    Path((course_id, session_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<LiveSessionUpdate>,
) -> Result<Json<LiveSessionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let course = require_course_manager(&state, &user, &course_id).await?;
    let session = load_session(&state, &course.id, &session_id).await?;
    if session.status.is_closed() {
        return Err(ApiError::Conflict(format!(
            "Live session is {} and can no longer be edited",
            session.status.as_str()
        )));
    }

    let updated = repositories::live_sessions::update(
        state.db(),
        &session.id,
        repositories::live_sessions::UpdateLiveSession {
            title: payload.title.map(|title| title.trim().to_string()),
            description: payload.description,
            scheduled_at: payload.scheduled_at,
            duration_minutes: payload.duration_minutes,
            meeting_url: payload.meeting_url,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update live session"))?
    .ok_or_else(|| ApiError::NotFound("Live session not found".to_string()))?;

    Ok(Json(LiveSessionResponse::from_db(updated)))
}

async fn delete_session(
    Path((course_id, session_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let course = require_course_manager(&state, &user, &course_id).await?;
    let session = load_session(&state, &course.id, &session_id).await?;

    repositories::live_sessions::delete(state.db(), &session.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete live session"))?;

    Ok(StatusCode::NO_CONTENT)
}

async fn change_status(
    Path((course_id, session_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<LiveSessionStatusUpdate>,
) -> Result<Json<LiveSessionResponse>, ApiError> {
    let course = require_course_manager(&state, &user, &course_id).await?;
    let session = load_session(&state, &course.id, &session_id).await?;
    let from = session.status;

    match check_transition(from, payload.status) {
        Some(Transition::Unchanged) => Ok(Json(LiveSessionResponse::from_db(session))),
        Some(Transition::Apply) => {
            let updated = repositories::live_sessions::transition(
                state.db(),
                &session.id,
                from,
                payload.status,
                primitive_now_utc(),
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to change live session status"))?
            .ok_or_else(|| {
                ApiError::Conflict("Live session status changed concurrently".to_string())
            })?;

            tracing::info!(
                user_id = %user.id,
                session_id = %updated.id,
                from = ?from,
                to = ?updated.status,
                action = "live_session_status",
                "Live session status changed"
            );
            Ok(Json(LiveSessionResponse::from_db(updated)))
        }
        None => Err(ApiError::Conflict(format!(
            "Cannot change live session status from {} to {}",
            from.as_str(),
            payload.status.as_str()
        ))),
    }
}

async fn load_session(
    state: &AppState,
    course_id: &str,
    session_id: &str,
) -> Result<LiveSession, ApiError> {
    repositories::live_sessions::find_in_course(state.db(), course_id, session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch live session"))?
        .ok_or_else(|| ApiError::NotFound("Live session not found".to_string()))
}
