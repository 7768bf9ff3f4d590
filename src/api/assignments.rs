use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, StatusCode},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{
    require_course_manager, require_course_reader, require_student, CourseAccess, CurrentUser,
};
use crate::api::uploads::{
    presigned_ttl, read_multipart, remove_objects, require_storage, UploadedFile,
};
use crate::api::validation::{sanitize_filename, validate_download_upload, validate_upload_size};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Assignment, User};
use crate::repositories;
use crate::schemas::assignment::{
    AssignmentCreate, AssignmentResponse, AssignmentUpdate, FileUrlResponse, SubmissionCreate,
    SubmissionGrade, SubmissionResponse,
};
use crate::services::storage::{attachment_key, content_type_for};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_assignments).post(create_assignment))
        .route(
            "/:assignment_id",
            get(get_assignment).patch(update_assignment).delete(delete_assignment),
        )
        .route("/:assignment_id/submissions", get(list_submissions).post(submit))
        .route("/:assignment_id/submissions/:submission_id/grade", post(grade_submission))
        .route(
            "/:assignment_id/submissions/:submission_id/attachment-url",
            get(attachment_url),
        )
}

async fn list_assignments(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AssignmentResponse>>, ApiError> {
    let access = require_course_reader(&state, &user, &course_id).await?;

    let assignments =
        repositories::assignments::list_by_course(state.db(), &access.course.id, !access.is_manager)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list assignments"))?;

    Ok(Json(assignments.into_iter().map(AssignmentResponse::from_db).collect()))
}

async fn create_assignment(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AssignmentCreate>,
) -> Result<(StatusCode, Json<AssignmentResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let course = require_course_manager(&state, &user, &course_id).await?;

    let assignment = repositories::assignments::create(
        state.db(),
        repositories::assignments::CreateAssignment {
            id: &Uuid::new_v4().to_string(),
            course_id: &course.id,
            title: payload.title.trim(),
            description: payload.description.as_deref(),
            due_at: payload.due_at,
            max_points: payload.max_points,
            allow_late: payload.allow_late,
            is_published: payload.is_published,
            created_by: &user.id,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create assignment"))?;

    Ok((StatusCode::CREATED, Json(AssignmentResponse::from_db(assignment))))
}

async fn get_assignment(
    Path((course_id, assignment_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let access = require_course_reader(&state, &user, &course_id).await?;
    let assignment = load_visible_assignment(&state, &access, &assignment_id).await?;
    Ok(Json(AssignmentResponse::from_db(assignment)))
}

async fn update_assignment(
    Path((course_id, assignment_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AssignmentUpdate>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let course = require_course_manager(&state, &user, &course_id).await?;
    let assignment = load_assignment(&state, &course.id, &assignment_id).await?;

    if let Some(max_points) = payload.max_points {
        let awarded = repositories::assignments::max_awarded_points(state.db(), &assignment.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check awarded points"))?;
        if awarded.is_some_and(|awarded| awarded > max_points) {
            return Err(ApiError::Conflict(
                "max_points cannot be lower than a grade already awarded".to_string(),
            ));
        }
    }

    let updated = repositories::assignments::update(
        state.db(),
        &assignment.id,
        repositories::assignments::UpdateAssignment {
            title: payload.title.map(|title| title.trim().to_string()),
            description: payload.description,
            due_at: payload.due_at,
            max_points: payload.max_points,
            allow_late: payload.allow_late,
            is_published: payload.is_published,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update assignment"))?
    .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))?;

    Ok(Json(AssignmentResponse::from_db(updated)))
}

async fn delete_assignment(
    Path((course_id, assignment_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let course = require_course_manager(&state, &user, &course_id).await?;
    let assignment = load_assignment(&state, &course.id, &assignment_id).await?;

    let attachment_keys = repositories::assignment_submissions::attachment_keys_by_assignment(
        state.db(),
        &assignment.id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list submission attachments"))?;

    repositories::assignments::delete(state.db(), &assignment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete assignment"))?;

    remove_objects(&state, &attachment_keys, "assignment_delete").await;

    tracing::info!(
        user_id = %user.id,
        assignment_id = %assignment.id,
        removed_attachments = attachment_keys.len(),
        action = "assignment_delete",
        "Assignment deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Accepts `application/json` `{content}` or `multipart/form-data` with `content` and `file`.
async fn submit(
    Path((course_id, assignment_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    request: Request,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    require_student(&user)?;
    let access = require_course_reader(&state, &user, &course_id).await?;
    let assignment = load_visible_assignment(&state, &access, &assignment_id).await?;

    let now = primitive_now_utc();
    let is_late = assignment.due_at.is_some_and(|due_at| now > due_at);
    if is_late && !assignment.allow_late {
        return Err(ApiError::BadRequest("Submission deadline has passed".to_string()));
    }

    let (content, file) = read_submission_body(&state, request).await?;
    if content.is_none() && file.is_none() {
        return Err(ApiError::BadRequest("Submission must include content or a file".to_string()));
    }

    let attachment = match file {
        Some(file) => Some(store_attachment(&state, &assignment, &user, file).await?),
        None => None,
    };

    let existing =
        repositories::assignment_submissions::find_by_student(state.db(), &assignment.id, &user.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch existing submission"))?;

    let stored = repositories::assignment_submissions::upsert(
        state.db(),
        repositories::assignment_submissions::UpsertSubmission {
            id: &Uuid::new_v4().to_string(),
            assignment_id: &assignment.id,
            student_id: &user.id,
            content: content.as_deref(),
            attachment_key: attachment.as_ref().map(|(key, _)| key.as_str()),
            attachment_name: attachment.as_ref().map(|(_, name)| name.as_str()),
            submitted_at: now,
            is_late,
        },
    )
    .await;

    let submission = match stored {
        Ok(submission) => submission,
        Err(err) => {
            if let Some((key, _)) = attachment {
                remove_objects(&state, &[key], "submission_rollback").await;
            }
            return Err(ApiError::internal(err, "Failed to store submission"));
        }
    };

    if let (Some(previous), Some((new_key, _))) = (existing.as_ref(), attachment.as_ref()) {
        if let Some(old_key) = previous.attachment_key.as_ref().filter(|old| *old != new_key) {
            remove_objects(&state, std::slice::from_ref(old_key), "attachment_replaced").await;
        }
    }

    tracing::info!(
        user_id = %user.id,
        assignment_id = %assignment.id,
        is_late,
        resubmission = existing.is_some(),
        action = "assignment_submit",
        "Assignment submitted"
    );

    let status = if existing.is_some() { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(SubmissionResponse::from_db(submission))))
}

async fn list_submissions(
    Path((course_id, assignment_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    let access = require_course_reader(&state, &user, &course_id).await?;
    let assignment = load_visible_assignment(&state, &access, &assignment_id).await?;

    let submissions = if access.is_manager {
        repositories::assignment_submissions::list_by_assignment(state.db(), &assignment.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?
    } else {
        repositories::assignment_submissions::find_by_student(state.db(), &assignment.id, &user.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
            .into_iter()
            .collect()
    };

    Ok(Json(submissions.into_iter().map(SubmissionResponse::from_db).collect()))
}

async fn grade_submission(
    Path((course_id, assignment_id, submission_id)): Path<(String, String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmissionGrade>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let course = require_course_manager(&state, &user, &course_id).await?;
    let assignment = load_assignment(&state, &course.id, &assignment_id).await?;

    if !payload.points.is_finite() || payload.points > assignment.max_points {
        return Err(ApiError::BadRequest(format!(
            "points must be between 0 and {}",
            assignment.max_points
        )));
    }

    let submission = repositories::assignment_submissions::find_in_assignment(
        state.db(),
        &assignment.id,
        &submission_id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
    .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    let graded = repositories::assignment_submissions::grade(
        state.db(),
        &submission.id,
        repositories::assignment_submissions::GradeSubmission {
            points: payload.points,
            feedback: payload.feedback.as_deref(),
            graded_by: &user.id,
            graded_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to grade submission"))?
    .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    tracing::info!(
        grader_id = %user.id,
        submission_id = %graded.id,
        points = payload.points,
        action = "assignment_grade",
        "Assignment submission graded"
    );

    Ok(Json(SubmissionResponse::from_db(graded)))
}

async fn attachment_url(
    Path((course_id, assignment_id, submission_id)): Path<(String, String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<FileUrlResponse>, ApiError> {
    let access = require_course_reader(&state, &user, &course_id).await?;
    let assignment = load_visible_assignment(&state, &access, &assignment_id).await?;

    let submission = repositories::assignment_submissions::find_in_assignment(
        state.db(),
        &assignment.id,
        &submission_id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
    .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    if !access.is_manager && submission.student_id != user.id {
        return Err(ApiError::NotFound("Submission not found".to_string()));
    }

    let key = submission
        .attachment_key
        .as_deref()
        .ok_or_else(|| ApiError::NotFound("Submission has no attachment".to_string()))?;

    let storage = require_storage(&state)?;
    let ttl = presigned_ttl(&state);
    let url = storage
        .presign_get(key, submission.attachment_name.as_deref(), ttl)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to generate attachment URL"))?;

    Ok(Json(FileUrlResponse { url, expires_in_seconds: ttl.as_secs() }))
}

async fn read_submission_body(
    state: &AppState,
    request: Request,
) -> Result<(Option<String>, Option<UploadedFile>), ApiError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    if is_multipart {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?;
        let mut form =
            read_multipart(multipart, state.settings().storage().max_upload_bytes()).await?;
        let content = form.text("content").map(str::to_string);
        Ok((content, form.file.take()))
    } else {
        let Json(payload) = Json::<SubmissionCreate>::from_request(request, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        let content = payload.content.filter(|content| !content.trim().is_empty());
        Ok((content, None))
    }
}

/// Returns `(object key, display name)` of the stored attachment.
async fn store_attachment(
    state: &AppState,
    assignment: &Assignment,
    user: &User,
    file: UploadedFile,
) -> Result<(String, String), ApiError> {
    let storage = require_storage(state)?;
    let extension = validate_download_upload(
        &file.filename,
        &state.settings().storage().allowed_download_extensions,
    )?;
    validate_upload_size(file.bytes.len(), state.settings().storage().max_upload_bytes())?;

    let key = attachment_key(&assignment.id, &user.id, &Uuid::new_v4().to_string(), &extension);
    let content_type = file
        .content_type
        .clone()
        .unwrap_or_else(|| content_type_for(&extension).to_string());

    storage
        .upload_bytes(&key, &content_type, file.bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store attachment"))?;

    Ok((key, sanitize_filename(&file.filename)))
}

async fn load_assignment(
    state: &AppState,
    course_id: &str,
    assignment_id: &str,
) -> Result<Assignment, ApiError> {
    repositories::assignments::find_in_course(state.db(), course_id, assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch assignment"))?
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))
}

/// Unpublished assignments are hidden from students.
async fn load_visible_assignment(
    state: &AppState,
    access: &CourseAccess,
    assignment_id: &str,
) -> Result<Assignment, ApiError> {
    let assignment = load_assignment(state, &access.course.id, assignment_id).await?;
    if !access.is_manager && !assignment.is_published {
        return Err(ApiError::NotFound("Assignment not found".to_string()));
    }
    Ok(assignment)
}
