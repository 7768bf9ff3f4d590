use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::{Duration, PrimitiveDateTime};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{
    require_course_manager, require_course_reader, require_student, CourseAccess, CurrentUser,
};
use crate::core::metrics::{QUIZ_ATTEMPTS_ABANDONED, QUIZ_ATTEMPTS_SUBMITTED};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Quiz, QuizAttempt, User};
use crate::db::types::AttemptStatus;
use crate::repositories;
use crate::schemas::quiz::{
    AttemptGradeRequest, AttemptListQuery, AttemptResponse, AttemptSubmit, QuizCreate,
    QuizResponse, QuizUpdate,
};
use crate::services::quiz_grading;
use crate::services::quiz_normalize::{self, NormalizeError};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_quizzes).post(create_quiz))
        .route("/:quiz_id", get(get_quiz).patch(update_quiz).delete(delete_quiz))
        .route("/:quiz_id/publish", post(publish_quiz))
        .route("/:quiz_id/unpublish", post(unpublish_quiz))
        .route("/:quiz_id/attempts", get(list_attempts).post(start_attempt))
        .route("/:quiz_id/attempts/:attempt_id", get(get_attempt))
        .route("/:quiz_id/attempts/:attempt_id/submit", post(submit_attempt))
        .route("/:quiz_id/attempts/:attempt_id/abandon", post(abandon_attempt))
        .route("/:quiz_id/attempts/:attempt_id/grade", post(grade_attempt))
}

fn normalize_error(err: NormalizeError) -> ApiError {
    ApiError::UnprocessableEntity(err.to_string())
}

async fn list_quizzes(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<QuizResponse>>, ApiError> {
    let access = require_course_reader(&state, &user, &course_id).await?;

    let quizzes =
        repositories::quizzes::list_by_course(state.db(), &access.course.id, !access.is_manager)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list quizzes"))?;

    Ok(Json(
        quizzes.into_iter().map(|quiz| QuizResponse::from_db(quiz, access.is_manager)).collect(),
    ))
}

async fn create_quiz(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<QuizCreate>,
) -> Result<(StatusCode, Json<QuizResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let course = require_course_manager(&state, &user, &course_id).await?;

    let settings = state.settings().quiz();
    let questions = quiz_normalize::normalize_questions(&payload.questions, settings.max_questions)
        .map_err(normalize_error)?;

    let quiz = repositories::quizzes::create(
        state.db(),
        repositories::quizzes::CreateQuiz {
            id: &Uuid::new_v4().to_string(),
            course_id: &course.id,
            title: payload.title.trim(),
            description: payload.description.as_deref(),
            questions: &questions,
            total_points: quiz_normalize::total_points(&questions),
            passing_score: payload.passing_score.unwrap_or(settings.default_passing_score),
            max_attempts: payload.max_attempts.unwrap_or(settings.default_max_attempts),
            time_limit_minutes: payload.time_limit_minutes,
            is_published: payload.is_published,
            created_by: &user.id,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create quiz"))?;

    tracing::info!(
        user_id = %user.id,
        quiz_id = %quiz.id,
        question_count = questions.len(),
        action = "quiz_create",
        "Quiz created"
    );

    Ok((StatusCode::CREATED, Json(QuizResponse::from_db(quiz, true))))
}

async fn get_quiz(
    Path((course_id, quiz_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<QuizResponse>, ApiError> {
    let access = require_course_reader(&state, &user, &course_id).await?;
    let quiz = load_visible_quiz(&state, &access, &quiz_id).await?;
    Ok(Json(QuizResponse::from_db(quiz, access.is_manager)))
}

async fn update_quiz(
    Path((course_id, quiz_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<QuizUpdate>,
) -> Result<Json<QuizResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let course = require_course_manager(&state, &user, &course_id).await?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    // Attempt creation holds FOR SHARE on this row, so the attempt check below cannot go stale.
    let quiz = repositories::quizzes::find_for_update(&mut *tx, &course.id, &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;

    let questions = match payload.questions.as_ref() {
        Some(raw) => {
            let has_attempts = repositories::quiz_attempts::exists_for_quiz(&mut *tx, &quiz.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to check quiz attempts"))?;
            if has_attempts {
                return Err(ApiError::Conflict(
                    "Questions cannot be changed after students have started attempts".to_string(),
                ));
            }
            let max_questions = state.settings().quiz().max_questions;
            Some(quiz_normalize::normalize_questions(raw, max_questions).map_err(normalize_error)?)
        }
        None => None,
    };
    let total_points = questions.as_deref().map(quiz_normalize::total_points);

    let updated = repositories::quizzes::update(
        &mut *tx,
        &quiz.id,
        repositories::quizzes::UpdateQuiz {
            title: payload.title.map(|title| title.trim().to_string()),
            description: payload.description,
            questions,
            total_points,
            passing_score: payload.passing_score,
            max_attempts: payload.max_attempts,
            time_limit_minutes: payload.time_limit_minutes,
            is_published: None,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update quiz"))?
    .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit quiz"))?;

    Ok(Json(QuizResponse::from_db(updated, true)))
}

async fn delete_quiz(
    Path((course_id, quiz_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let course = require_course_manager(&state, &user, &course_id).await?;
    let quiz = load_quiz(&state, &course.id, &quiz_id).await?;

    repositories::quizzes::delete(state.db(), &quiz.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete quiz"))?;

    tracing::info!(user_id = %user.id, quiz_id = %quiz.id, action = "quiz_delete", "Quiz deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn publish_quiz(
    Path((course_id, quiz_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<QuizResponse>, ApiError> {
    set_published(&state, &user, &course_id, &quiz_id, true).await
}

async fn unpublish_quiz(
    Path((course_id, quiz_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<QuizResponse>, ApiError> {
    set_published(&state, &user, &course_id, &quiz_id, false).await
}

async fn set_published(
    state: &AppState,
    user: &User,
    course_id: &str,
    quiz_id: &str,
    is_published: bool,
) -> Result<Json<QuizResponse>, ApiError> {
    let course = require_course_manager(state, user, course_id).await?;
    let quiz = load_quiz(state, &course.id, quiz_id).await?;

    let updated = repositories::quizzes::update(
        state.db(),
        &quiz.id,
        repositories::quizzes::UpdateQuiz {
            title: None,
            description: None,
            questions: None,
            total_points: None,
            passing_score: None,
            max_attempts: None,
            time_limit_minutes: None,
            is_published: Some(is_published),
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update quiz"))?
    .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;

    tracing::info!(
        user_id = %user.id,
        quiz_id = %updated.id,
        is_published,
        action = "quiz_publish",
        "Quiz visibility changed"
    );
    Ok(Json(QuizResponse::from_db(updated, true)))
}

/// Resumes the running attempt or opens a new one within the attempt cap.
async fn start_attempt(
    Path((course_id, quiz_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<AttemptResponse>), ApiError> {
    require_student(&user)?;
    let access = require_course_reader(&state, &user, &course_id).await?;
    let visible = load_visible_quiz(&state, &access, &quiz_id).await?;
    let now = primitive_now_utc();

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    repositories::quiz_attempts::lock_for_student(&mut *tx, &visible.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock attempts"))?;

    // Re-read under FOR SHARE: the attempt snapshots total_points, so the questions
    // must not change until the attempt row is committed.
    let quiz = repositories::quizzes::find_for_share(&mut *tx, &access.course.id, &visible.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?
        .filter(|quiz| quiz.is_published || access.is_manager)
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;

    let running = repositories::quiz_attempts::find_in_progress(&mut *tx, &quiz.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch running attempt"))?;

    if let Some(attempt) = running {
        if !is_past_deadline(&state, &attempt, now) {
            tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit attempt"))?;
            return Ok((StatusCode::OK, Json(AttemptResponse::from_db(attempt, false, now))));
        }
        repositories::quiz_attempts::mark_abandoned(&mut *tx, &attempt.id, now)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to close expired attempt"))?;
        metrics::counter!(QUIZ_ATTEMPTS_ABANDONED).increment(1);
    }

    let used = repositories::quiz_attempts::count_for_student(&mut *tx, &quiz.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count attempts"))?;
    if used >= i64::from(quiz.max_attempts) {
        tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit attempt"))?;
        return Err(ApiError::BadRequest("Maximum attempts reached".to_string()));
    }

    let attempt = repositories::quiz_attempts::create(
        &mut *tx,
        repositories::quiz_attempts::CreateAttempt {
            id: &Uuid::new_v4().to_string(),
            quiz_id: &quiz.id,
            course_id: &quiz.course_id,
            student_id: &user.id,
            attempt_number: used as i32 + 1,
            total_points: quiz.total_points,
            started_at: now,
            expires_at: quiz
                .time_limit_minutes
                .map(|minutes| now + Duration::minutes(i64::from(minutes))),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create attempt"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit attempt"))?;

    tracing::info!(
        user_id = %user.id,
        quiz_id = %quiz.id,
        attempt_id = %attempt.id,
        attempt_number = attempt.attempt_number,
        action = "quiz_attempt_start",
        "Quiz attempt started"
    );

    Ok((StatusCode::CREATED, Json(AttemptResponse::from_db(attempt, false, now))))
}

async fn submit_attempt(
    Path((course_id, quiz_id, attempt_id)): Path<(String, String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AttemptSubmit>,
) -> Result<Json<AttemptResponse>, ApiError> {
    require_student(&user)?;
    let access = require_course_reader(&state, &user, &course_id).await?;
    let quiz = load_visible_quiz(&state, &access, &quiz_id).await?;
    let now = primitive_now_utc();

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let attempt = repositories::quiz_attempts::find_for_update(&mut *tx, &quiz.id, &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
        .filter(|attempt| attempt.student_id == user.id)
        .ok_or_else(|| ApiError::NotFound("Attempt not found".to_string()))?;

    if attempt.status != AttemptStatus::InProgress {
        return Err(ApiError::BadRequest("Attempt is not in progress".to_string()));
    }

    if is_past_deadline(&state, &attempt, now) {
        repositories::quiz_attempts::mark_abandoned(&mut *tx, &attempt.id, now)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to close expired attempt"))?;
        tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit attempt"))?;
        metrics::counter!(QUIZ_ATTEMPTS_ABANDONED).increment(1);
        tracing::info!(
            user_id = %user.id,
            attempt_id = %attempt.id,
            action = "quiz_attempt_expired",
            "Quiz attempt submitted after time limit"
        );
        return Err(ApiError::BadRequest("Time limit for this attempt has expired".to_string()));
    }

    let questions = &quiz.questions.0;
    let answers = quiz_grading::collect_answers(questions, &payload.answers)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let graded = quiz_grading::grade_submission(questions, &answers);
    let summary = quiz_grading::summarize(&graded, attempt.total_points, quiz.passing_score);

    let completed = repositories::quiz_attempts::complete(
        &mut *tx,
        &attempt.id,
        repositories::quiz_attempts::StoreGrading {
            answers: &graded,
            score: summary.score,
            total_points: summary.total_points,
            percentage: summary.percentage,
            passed: summary.passed,
            needs_manual_grading: summary.needs_manual_grading,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to store attempt result"))?
    .ok_or_else(|| ApiError::BadRequest("Attempt is not in progress".to_string()))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit attempt"))?;

    metrics::counter!(QUIZ_ATTEMPTS_SUBMITTED).increment(1);
    tracing::info!(
        user_id = %user.id,
        quiz_id = %quiz.id,
        attempt_id = %completed.id,
        score = completed.score,
        needs_manual_grading = completed.needs_manual_grading,
        action = "quiz_attempt_submit",
        "Quiz attempt submitted"
    );

    Ok(Json(AttemptResponse::from_db(completed, false, now)))
}

async fn abandon_attempt(
    Path((course_id, quiz_id, attempt_id)): Path<(String, String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptResponse>, ApiError> {
    require_student(&user)?;
    let access = require_course_reader(&state, &user, &course_id).await?;
    let quiz = load_visible_quiz(&state, &access, &quiz_id).await?;
    let attempt = load_attempt(&state, &quiz.id, &attempt_id).await?;
    if attempt.student_id != user.id {
        return Err(ApiError::NotFound("Attempt not found".to_string()));
    }

    let now = primitive_now_utc();
    let abandoned = repositories::quiz_attempts::mark_abandoned(state.db(), &attempt.id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to abandon attempt"))?
        .ok_or_else(|| ApiError::BadRequest("Attempt is not in progress".to_string()))?;

    metrics::counter!(QUIZ_ATTEMPTS_ABANDONED).increment(1);
    tracing::info!(
        user_id = %user.id,
        attempt_id = %abandoned.id,
        action = "quiz_attempt_abandon",
        "Quiz attempt abandoned"
    );

    Ok(Json(AttemptResponse::from_db(abandoned, false, now)))
}

async fn list_attempts(
    Path((course_id, quiz_id)): Path<(String, String)>,
    Query(params): Query<AttemptListQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AttemptResponse>>, ApiError> {
    let access = require_course_reader(&state, &user, &course_id).await?;
    let quiz = load_visible_quiz(&state, &access, &quiz_id).await?;

    let student_filter =
        if access.is_manager { params.student_id.as_deref() } else { Some(user.id.as_str()) };
    let attempts = repositories::quiz_attempts::list_by_quiz(state.db(), &quiz.id, student_filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;

    let now = primitive_now_utc();
    Ok(Json(
        attempts
            .into_iter()
            .map(|attempt| AttemptResponse::from_db(attempt, access.is_manager, now))
            .collect(),
    ))
}

async fn get_attempt(
    Path((course_id, quiz_id, attempt_id)): Path<(String, String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let access = require_course_reader(&state, &user, &course_id).await?;
    let quiz = load_visible_quiz(&state, &access, &quiz_id).await?;
    let attempt = load_attempt(&state, &quiz.id, &attempt_id).await?;
    if !access.is_manager && attempt.student_id != user.id {
        return Err(ApiError::NotFound("Attempt not found".to_string()));
    }

    Ok(Json(AttemptResponse::from_db(attempt, access.is_manager, primitive_now_utc())))
}

async fn grade_attempt(
    Path((course_id, quiz_id, attempt_id)): Path<(String, String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AttemptGradeRequest>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let course = require_course_manager(&state, &user, &course_id).await?;
    let quiz = load_quiz(&state, &course.id, &quiz_id).await?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let attempt = repositories::quiz_attempts::find_for_update(&mut *tx, &quiz.id, &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
        .ok_or_else(|| ApiError::NotFound("Attempt not found".to_string()))?;
    if attempt.status != AttemptStatus::Completed {
        return Err(ApiError::BadRequest("Only completed attempts can be graded".to_string()));
    }

    let mut answers = attempt.answers.0;
    quiz_grading::apply_manual_grades(&mut answers, &payload.grades)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let summary = quiz_grading::summarize(&answers, attempt.total_points, quiz.passing_score);

    let now = primitive_now_utc();
    let graded = repositories::quiz_attempts::store_manual_grades(
        &mut *tx,
        &attempt.id,
        repositories::quiz_attempts::StoreGrading {
            answers: &answers,
            score: summary.score,
            total_points: summary.total_points,
            percentage: summary.percentage,
            passed: summary.passed,
            needs_manual_grading: summary.needs_manual_grading,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to store grades"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit grades"))?;

    tracing::info!(
        user_id = %user.id,
        attempt_id = %graded.id,
        graded_questions = payload.grades.len(),
        score = graded.score,
        action = "quiz_attempt_grade",
        "Quiz attempt graded"
    );

    Ok(Json(AttemptResponse::from_db(graded, true, now)))
}

/// True once the time limit plus the submit grace window has run out.
fn is_past_deadline(state: &AppState, attempt: &QuizAttempt, now: PrimitiveDateTime) -> bool {
    let grace = Duration::seconds(state.settings().quiz().submit_grace_seconds);
    attempt.expires_at.is_some_and(|expires_at| now > expires_at + grace)
}

async fn load_quiz(state: &AppState, course_id: &str, quiz_id: &str) -> Result<Quiz, ApiError> {
    repositories::quizzes::find_in_course(state.db(), course_id, quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))
}

/// Drafts do not exist for students.
async fn load_visible_quiz(
    state: &AppState,
    access: &CourseAccess,
    quiz_id: &str,
) -> Result<Quiz, ApiError> {
    let quiz = load_quiz(state, &access.course.id, quiz_id).await?;
    if !access.is_manager && !quiz.is_published {
        return Err(ApiError::NotFound("Quiz not found".to_string()));
    }
    Ok(quiz)
}

async fn load_attempt(
    state: &AppState,
    quiz_id: &str,
    attempt_id: &str,
) -> Result<QuizAttempt, ApiError> {
    repositories::quiz_attempts::find_in_quiz(state.db(), quiz_id, attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
        .ok_or_else(|| ApiError::NotFound("Attempt not found".to_string()))
}

#[cfg(test)]
mod tests;
