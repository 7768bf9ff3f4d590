use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_student, CurrentStaff, CurrentUser};
use crate::api::pagination::Pagination;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Classroom, User};
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::classroom::{
    AddStudentRequest, ClassroomCreate, ClassroomResponse, ClassroomUpdate, JoinClassroomRequest,
};
use crate::schemas::user::RosterEntryResponse;
use crate::services::join_codes;

/// Retries when a freshly generated join code collides with an existing one.
const JOIN_CODE_ATTEMPTS: usize = 5;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_classrooms).post(create_classroom))
        .route("/join", post(join_classroom))
        .route(
            "/:classroom_id",
            get(get_classroom).patch(update_classroom).delete(delete_classroom),
        )
        .route("/:classroom_id/join-code/rotate", post(rotate_join_code))
        .route("/:classroom_id/students", get(list_students).post(add_student))
        .route("/:classroom_id/students/:student_id", delete(remove_student))
}

async fn create_classroom(
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<ClassroomCreate>,
) -> Result<(StatusCode, Json<ClassroomResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let id = Uuid::new_v4().to_string();
    let now = primitive_now_utc();
    let mut attempts = 0;
    let classroom = loop {
        attempts += 1;
        let join_code = join_codes::generate_join_code();
        let created = repositories::classrooms::create(
            state.db(),
            repositories::classrooms::CreateClassroom {
                id: &id,
                name: payload.name.trim(),
                description: payload.description.as_deref(),
                teacher_id: &user.id,
                join_code: &join_code,
                created_at: now,
            },
        )
        .await;

        match created {
            Ok(classroom) => break classroom,
            Err(err) if crate::db::is_unique_violation(&err) && attempts < JOIN_CODE_ATTEMPTS => {
                tracing::debug!(attempts, "Join code collision, regenerating");
            }
            Err(err) => return Err(ApiError::internal(err, "Failed to create classroom")),
        }
    };

    Ok((StatusCode::CREATED, Json(ClassroomResponse::from_db(classroom, true))))
}

async fn list_classrooms(
    Query(page): Query<Pagination>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ClassroomResponse>>, ApiError> {
    let classrooms = match user.role {
        UserRole::Admin => {
            repositories::classrooms::list_all(state.db(), page.skip(), page.limit()).await
        }
        UserRole::Teacher => {
            repositories::classrooms::list_by_teacher(
                state.db(),
                &user.id,
                page.skip(),
                page.limit(),
            )
            .await
        }
        UserRole::Student => {
            repositories::classrooms::list_by_member(state.db(), &user.id, page.skip(), page.limit())
                .await
        }
    }
    .map_err(|e| ApiError::internal(e, "Failed to list classrooms"))?;

    let show_join_code = user.role.is_staff();
    Ok(Json(
        classrooms
            .into_iter()
            .map(|classroom| ClassroomResponse::from_db(classroom, show_join_code))
            .collect(),
    ))
}

async fn get_classroom(
    Path(classroom_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ClassroomResponse>, ApiError> {
    let classroom = load_classroom(&state, &classroom_id).await?;
    if can_manage(&user, &classroom) {
        return Ok(Json(ClassroomResponse::from_db(classroom, true)));
    }

    let is_member = repositories::classrooms::is_member(state.db(), &classroom.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check classroom membership"))?;
    if !is_member {
        return Err(ApiError::Forbidden("Access to this classroom is not allowed"));
    }

    Ok(Json(ClassroomResponse::from_db(classroom, false)))
}

async fn update_classroom(
    Path(classroom_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ClassroomUpdate>,
) -> Result<Json<ClassroomResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let classroom = require_manager(&state, &user, &classroom_id).await?;

    let updated = repositories::classrooms::update(
        state.db(),
        &classroom.id,
        repositories::classrooms::UpdateClassroom {
            name: payload.name.map(|name| name.trim().to_string()),
            description: payload.description,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update classroom"))?
    .ok_or_else(|| ApiError::NotFound("Classroom not found".to_string()))?;

    Ok(Json(ClassroomResponse::from_db(updated, true)))
}

async fn delete_classroom(
    Path(classroom_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let classroom = require_manager(&state, &user, &classroom_id).await?;

    let deleted = repositories::classrooms::delete(state.db(), &classroom.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete classroom"))?;
    if !deleted {
        return Err(ApiError::NotFound("Classroom not found".to_string()));
    }

    tracing::info!(
        user_id = %user.id,
        classroom_id = %classroom.id,
        action = "classroom_delete",
        "Classroom deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn rotate_join_code(
    Path(classroom_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ClassroomResponse>, ApiError> {
    let classroom = require_manager(&state, &user, &classroom_id).await?;

    let mut attempts = 0;
    let updated = loop {
        attempts += 1;
        let join_code = join_codes::generate_join_code();
        let result = repositories::classrooms::set_join_code(
            state.db(),
            &classroom.id,
            &join_code,
            primitive_now_utc(),
        )
        .await;

        match result {
            Ok(updated) => break updated,
            Err(err) if crate::db::is_unique_violation(&err) && attempts < JOIN_CODE_ATTEMPTS => {}
            Err(err) => return Err(ApiError::internal(err, "Failed to rotate join code")),
        }
    };

    let updated = updated.ok_or_else(|| ApiError::NotFound("Classroom not found".to_string()))?;
    Ok(Json(ClassroomResponse::from_db(updated, true)))
}

async fn join_classroom(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<JoinClassroomRequest>,
) -> Result<Json<ClassroomResponse>, ApiError> {
    require_student(&user)?;

    let join_code = join_codes::normalize_join_code(&payload.join_code);
    if join_code.is_empty() {
        return Err(ApiError::BadRequest("Join code is required".to_string()));
    }

    let classroom = repositories::classrooms::find_by_join_code(state.db(), &join_code)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to look up join code"))?
        .ok_or_else(|| ApiError::NotFound("Invalid join code".to_string()))?;

    let joined = repositories::classrooms::add_member(
        state.db(),
        &classroom.id,
        &user.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to join classroom"))?;

    if joined {
        tracing::info!(
            user_id = %user.id,
            classroom_id = %classroom.id,
            action = "classroom_join",
            "Student joined classroom"
        );
    }

    Ok(Json(ClassroomResponse::from_db(classroom, false)))
}

async fn list_students(
    Path(classroom_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<RosterEntryResponse>>, ApiError> {
    let classroom = require_manager(&state, &user, &classroom_id).await?;

    let members = repositories::classrooms::list_members(state.db(), &classroom.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list classroom students"))?;

    Ok(Json(members.into_iter().map(RosterEntryResponse::from_db).collect()))
}

async fn add_student(
    Path(classroom_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AddStudentRequest>,
) -> Result<StatusCode, ApiError> {
    let classroom = require_manager(&state, &user, &classroom_id).await?;

    let student = repositories::users::find_by_id(state.db(), &payload.student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;
    if student.role != UserRole::Student {
        return Err(ApiError::BadRequest("Only students can be added to a classroom".to_string()));
    }

    let added = repositories::classrooms::add_member(
        state.db(),
        &classroom.id,
        &student.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to add student"))?;

    Ok(if added { StatusCode::CREATED } else { StatusCode::OK })
}

async fn remove_student(
    Path((classroom_id, student_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let classroom = require_manager(&state, &user, &classroom_id).await?;

    let removed = repositories::classrooms::remove_member(state.db(), &classroom.id, &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to remove student"))?;
    if !removed {
        return Err(ApiError::NotFound("Student is not a member of this classroom".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

fn can_manage(user: &User, classroom: &Classroom) -> bool {
    user.is_admin() || (user.role == UserRole::Teacher && classroom.teacher_id == user.id)
}

async fn load_classroom(state: &AppState, classroom_id: &str) -> Result<Classroom, ApiError> {
    repositories::classrooms::find_by_id(state.db(), classroom_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch classroom"))?
        .ok_or_else(|| ApiError::NotFound("Classroom not found".to_string()))
}

async fn require_manager(
    state: &AppState,
    user: &User,
    classroom_id: &str,
) -> Result<Classroom, ApiError> {
    let classroom = load_classroom(state, classroom_id).await?;
    if can_manage(user, &classroom) {
        Ok(classroom)
    } else {
        Err(ApiError::Forbidden("Not enough permissions for this classroom"))
    }
}

#[cfg(test)]
mod tests;
