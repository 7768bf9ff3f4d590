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
use crate::api::guards::{
    load_course, require_course_manager, require_course_reader, require_student, CurrentStaff,
    CurrentUser,
};
use crate::api::pagination::Pagination;
use crate::api::uploads::remove_objects;
use crate::api::{assignments, downloads, live_sessions, quizzes};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::course::{CourseCreate, CourseResponse, CourseUpdate, EnrollmentResponse};
use crate::schemas::user::RosterEntryResponse;

#[derive(Debug, Deserialize)]
pub(crate) struct ListCoursesQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
    /// Students only: every published course instead of the accessible ones.
    #[serde(default)]
    available: bool,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/:course_id", get(get_course).patch(update_course).delete(delete_course))
        .route("/:course_id/enroll", post(enroll).delete(unenroll))
        .route("/:course_id/students", get(list_students))
        .nest("/:course_id/assignments", assignments::router())
        .nest("/:course_id/quizzes", quizzes::router())
        .nest("/:course_id/live-sessions", live_sessions::router())
        .nest("/:course_id/downloads", downloads::router())
}

async fn create_course(
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<CourseCreate>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if let Some(classroom_id) = payload.classroom_id.as_deref() {
        ensure_classroom_owned(&state, &user, classroom_id).await?;
    }

    let course = repositories::courses::create(
        state.db(),
        repositories::courses::CreateCourse {
            id: &Uuid::new_v4().to_string(),
            title: payload.title.trim(),
            description: payload.description.as_deref(),
            teacher_id: &user.id,
            classroom_id: payload.classroom_id.as_deref(),
            is_published: payload.is_published,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create course"))?;

    Ok((StatusCode::CREATED, Json(CourseResponse::from_db(course))))
}

async fn list_courses(
    Query(params): Query<ListCoursesQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let page = Pagination { skip: params.skip, limit: params.limit };
    let courses = match user.role {
        UserRole::Admin => {
            repositories::courses::list_all(state.db(), page.skip(), page.limit()).await
        }
        UserRole::Teacher => {
            repositories::courses::list_by_teacher(state.db(), &user.id, page.skip(), page.limit())
                .await
        }
        UserRole::Student if params.available => {
            repositories::courses::list_published(state.db(), page.skip(), page.limit()).await
        }
        UserRole::Student => {
            repositories::courses::list_accessible_for_student(
                state.db(),
                &user.id,
                page.skip(),
                page.limit(),
            )
            .await
        }
    }
    .map_err(|e| ApiError::internal(e, "Failed to list courses"))?;

    Ok(Json(courses.into_iter().map(CourseResponse::from_db).collect()))
}

async fn get_course(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<CourseResponse>, ApiError> {
    let access = require_course_reader(&state, &user, &course_id).await?;
    Ok(Json(CourseResponse::from_db(access.course)))
}

async fn update_course(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CourseUpdate>,
) -> Result<Json<CourseResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let course = require_course_manager(&state, &user, &course_id).await?;
    if let Some(classroom_id) = payload.classroom_id.as_deref() {
        ensure_classroom_owned(&state, &user, classroom_id).await?;
    }

    let updated = repositories::courses::update(
        state.db(),
        &course.id,
        repositories::courses::UpdateCourse {
            title: payload.title.map(|title| title.trim().to_string()),
            description: payload.description,
            classroom_id: payload.classroom_id,
            is_published: payload.is_published,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update course"))?
    .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    Ok(Json(CourseResponse::from_db(updated)))
}

async fn delete_course(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let course = require_course_manager(&state, &user, &course_id).await?;

    let mut object_keys: Vec<String> =
        repositories::downloads::list_by_course(state.db(), &course.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list course downloads"))?
            .into_iter()
            .map(|download| download.file_key)
            .collect();
    let removed_downloads = object_keys.len();
    object_keys.extend(
        repositories::assignment_submissions::attachment_keys_by_course(state.db(), &course.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list submission attachments"))?,
    );

    let deleted = repositories::courses::delete(state.db(), &course.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete course"))?;
    if !deleted {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    remove_objects(&state, &object_keys, "course_delete").await;

    tracing::info!(
        user_id = %user.id,
        course_id = %course.id,
        removed_downloads,
        removed_attachments = object_keys.len() - removed_downloads,
        action = "course_delete",
        "Course deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn enroll(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<EnrollmentResponse>), ApiError> {
    require_student(&user)?;
    let course = load_course(&state, &course_id).await?;
    if !course.is_published {
        return Err(ApiError::BadRequest("Course is not open for enrollment".to_string()));
    }

    let created =
        repositories::courses::enroll(state.db(), &course.id, &user.id, primitive_now_utc())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to enroll"))?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(EnrollmentResponse { course_id: course.id, student_id: user.id, enrolled: true }),
    ))
}

async fn unenroll(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    require_student(&user)?;
    let course = load_course(&state, &course_id).await?;

    let removed = repositories::courses::unenroll(state.db(), &course.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to unenroll"))?;
    if !removed {
        return Err(ApiError::NotFound("You are not enrolled in this course".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn list_students(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<RosterEntryResponse>>, ApiError> {
    let course = require_course_manager(&state, &user, &course_id).await?;

    let students = repositories::courses::list_students(state.db(), &course)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list course students"))?;

    Ok(Json(students.into_iter().map(RosterEntryResponse::from_db).collect()))
}

async fn ensure_classroom_owned(
    state: &AppState,
    user: &User,
    classroom_id: &str,
) -> Result<(), ApiError> {
    let classroom = repositories::classrooms::find_by_id(state.db(), classroom_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch classroom"))?
        .ok_or_else(|| ApiError::NotFound("Classroom not found".to_string()))?;

    if user.is_admin() || classroom.teacher_id == user.id {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Classroom belongs to another teacher"))
    }
}
