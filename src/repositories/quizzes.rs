use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::documents::Question;
use crate::db::models::Quiz;

const COLUMNS: &str = "id, course_id, title, description, questions, total_points, passing_score, \
    max_attempts, time_limit_minutes, is_published, created_by, created_at, updated_at";

pub(crate) struct CreateQuiz<'a> {
    pub(crate) id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) questions: &'a [Question],
    pub(crate) total_points: f64,
    pub(crate) passing_score: f64,
    pub(crate) max_attempts: i32,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) is_published: bool,
    pub(crate) created_by: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateQuiz<'_>) -> Result<Quiz, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "INSERT INTO quizzes (
            id, course_id, title, description, questions, total_points, passing_score,
            max_attempts, time_limit_minutes, is_published, created_by, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$12)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.course_id)
    .bind(params.title)
    .bind(params.description)
    .bind(Json(params.questions))
    .bind(params.total_points)
    .bind(params.passing_score)
    .bind(params.max_attempts)
    .bind(params.time_limit_minutes)
    .bind(params.is_published)
    .bind(params.created_by)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_in_course(
    pool: &PgPool,
    course_id: &str,
    id: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {COLUMNS} FROM quizzes WHERE id = $1 AND course_id = $2"))
        .bind(id)
        .bind(course_id)
        .fetch_optional(pool)
        .await
}

/// Row-locked read inside a transaction. `lock` is `FOR SHARE` or `FOR UPDATE`.
async fn find_locked(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
    id: &str,
    lock: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {COLUMNS} FROM quizzes WHERE id = $1 AND course_id = $2 {lock}"
    ))
    .bind(id)
    .bind(course_id)
    .fetch_optional(executor)
    .await
}

/// Blocks question edits until the caller's transaction ends.
pub(crate) async fn find_for_share(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
    id: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    find_locked(executor, course_id, id, "FOR SHARE").await
}

pub(crate) async fn find_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
    id: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    find_locked(executor, course_id, id, "FOR UPDATE").await
}

pub(crate) async fn list_by_course(
    pool: &PgPool,
    course_id: &str,
    published_only: bool,
) -> Result<Vec<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {COLUMNS} FROM quizzes
         WHERE course_id = $1 AND (is_published OR NOT $2)
         ORDER BY created_at ASC, id"
    ))
    .bind(course_id)
    .bind(published_only)
    .fetch_all(pool)
    .await
}

pub(crate) struct UpdateQuiz {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) questions: Option<Vec<Question>>,
    pub(crate) total_points: Option<f64>,
    pub(crate) passing_score: Option<f64>,
    pub(crate) max_attempts: Option<i32>,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) is_published: Option<bool>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: UpdateQuiz,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "UPDATE quizzes SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            questions = COALESCE($3, questions),
            total_points = COALESCE($4, total_points),
            passing_score = COALESCE($5, passing_score),
            max_attempts = COALESCE($6, max_attempts),
            time_limit_minutes = COALESCE($7, time_limit_minutes),
            is_published = COALESCE($8, is_published),
            updated_at = $9
         WHERE id = $10
         RETURNING {COLUMNS}",
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.questions.map(Json))
    .bind(params.total_points)
    .bind(params.passing_score)
    .bind(params.max_attempts)
    .bind(params.time_limit_minutes)
    .bind(params.is_published)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM quizzes WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
