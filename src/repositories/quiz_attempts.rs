use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::documents::GradedAnswer;
use crate::db::models::QuizAttempt;
use crate::db::types::AttemptStatus;

const COLUMNS: &str = "id, quiz_id, course_id, student_id, attempt_number, status, answers, \
    score, total_points, percentage, passed, needs_manual_grading, started_at, expires_at, \
    submitted_at, updated_at";

/// Serialises attempt creation for one (quiz, student) pair until the transaction ends.
pub(crate) async fn lock_for_student(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    student_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(format!("quiz-attempt:{quiz_id}:{student_id}"))
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn find_in_progress(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    student_id: &str,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts
         WHERE quiz_id = $1 AND student_id = $2 AND status = $3
         FOR UPDATE"
    ))
    .bind(quiz_id)
    .bind(student_id)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn count_for_student(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    student_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM quiz_attempts WHERE quiz_id = $1 AND student_id = $2")
        .bind(quiz_id)
        .bind(student_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn exists_for_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM quiz_attempts WHERE quiz_id = $1)")
        .bind(quiz_id)
        .fetch_one(executor)
        .await
}

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) quiz_id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) attempt_number: i32,
    pub(crate) total_points: f64,
    pub(crate) started_at: time::PrimitiveDateTime,
    pub(crate) expires_at: Option<time::PrimitiveDateTime>,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateAttempt<'_>,
) -> Result<QuizAttempt, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "INSERT INTO quiz_attempts (
            id, quiz_id, course_id, student_id, attempt_number, status, total_points,
            started_at, expires_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$8)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.quiz_id)
    .bind(params.course_id)
    .bind(params.student_id)
    .bind(params.attempt_number)
    .bind(AttemptStatus::InProgress)
    .bind(params.total_points)
    .bind(params.started_at)
    .bind(params.expires_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_in_quiz(
    pool: &PgPool,
    quiz_id: &str,
    id: &str,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts WHERE id = $1 AND quiz_id = $2"
    ))
    .bind(id)
    .bind(quiz_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    id: &str,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts WHERE id = $1 AND quiz_id = $2 FOR UPDATE"
    ))
    .bind(id)
    .bind(quiz_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_by_quiz(
    pool: &PgPool,
    quiz_id: &str,
    student_id: Option<&str>,
) -> Result<Vec<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts
         WHERE quiz_id = $1 AND ($2::varchar IS NULL OR student_id = $2)
         ORDER BY started_at DESC, attempt_number DESC"
    ))
    .bind(quiz_id)
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn mark_abandoned(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: time::PrimitiveDateTime,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "UPDATE quiz_attempts SET status = $1, updated_at = $2
         WHERE id = $3 AND status = $4
         RETURNING {COLUMNS}"
    ))
    .bind(AttemptStatus::Abandoned)
    .bind(now)
    .bind(id)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(executor)
    .await
}

pub(crate) struct StoreGrading<'a> {
    pub(crate) answers: &'a [GradedAnswer],
    pub(crate) score: f64,
    pub(crate) total_points: f64,
    pub(crate) percentage: f64,
    pub(crate) passed: bool,
    pub(crate) needs_manual_grading: bool,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

/// Finishes an in-progress attempt. Returns `None` when it was no longer in progress.
pub(crate) async fn complete(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    grading: StoreGrading<'_>,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "UPDATE quiz_attempts SET
            status = $1, answers = $2, score = $3, total_points = $4, percentage = $5,
            passed = $6, needs_manual_grading = $7, submitted_at = $8, updated_at = $8
         WHERE id = $9 AND status = $10
         RETURNING {COLUMNS}"
    ))
    .bind(AttemptStatus::Completed)
    .bind(Json(grading.answers))
    .bind(grading.score)
    .bind(grading.total_points)
    .bind(grading.percentage)
    .bind(grading.passed)
    .bind(grading.needs_manual_grading)
    .bind(grading.updated_at)
    .bind(id)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn store_manual_grades(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    grading: StoreGrading<'_>,
) -> Result<QuizAttempt, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "UPDATE quiz_attempts SET
            answers = $1, score = $2, total_points = $3, percentage = $4,
            passed = $5, needs_manual_grading = $6, updated_at = $7
         WHERE id = $8
         RETURNING {COLUMNS}"
    ))
    .bind(Json(grading.answers))
    .bind(grading.score)
    .bind(grading.total_points)
    .bind(grading.percentage)
    .bind(grading.passed)
    .bind(grading.needs_manual_grading)
    .bind(grading.updated_at)
    .bind(id)
    .fetch_one(executor)
    .await
}
