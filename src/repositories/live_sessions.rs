use sqlx::PgPool;

use crate::db::models::LiveSession;
use crate::db::types::LiveSessionStatus;

const COLUMNS: &str = "id, course_id, title, description, scheduled_at, duration_minutes, \
    meeting_url, status, created_by, created_at, updated_at";

pub(crate) struct CreateLiveSession<'a> {
    pub(crate) id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) scheduled_at: time::PrimitiveDateTime,
    pub(crate) duration_minutes: i32,
    pub(crate) meeting_url: Option<&'a str>,
    pub(crate) created_by: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateLiveSession<'_>,
) -> Result<LiveSession, sqlx::Error> {
    sqlx::query_as::<_, LiveSession>(&format!(
        "INSERT INTO live_sessions (
            id, course_id, title, description, scheduled_at, duration_minutes, meeting_url,
            status, created_by, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$10)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.course_id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.scheduled_at)
    .bind(params.duration_minutes)
    .bind(params.meeting_url)
    .bind(LiveSessionStatus::Scheduled)
    .bind(params.created_by)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_in_course(
    pool: &PgPool,
    course_id: &str,
    id: &str,
) -> Result<Option<LiveSession>, sqlx::Error> {
    sqlx::query_as::<_, LiveSession>(&format!(
        "SELECT {COLUMNS} FROM live_sessions WHERE id = $1 AND course_id = $2"
    ))
    .bind(id)
    .bind(course_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_course(
    pool: &PgPool,
    course_id: &str,
    upcoming_only: bool,
) -> Result<Vec<LiveSession>, sqlx::Error> {
    sqlx::query_as::<_, LiveSession>(&format!(
        "SELECT {COLUMNS} FROM live_sessions
         WHERE course_id = $1 AND (NOT $2 OR status IN ($3, $4))
         ORDER BY scheduled_at ASC, id"
    ))
    .bind(course_id)
    .bind(upcoming_only)
    .bind(LiveSessionStatus::Scheduled)
    .bind(LiveSessionStatus::Live)
    .fetch_all(pool)
    .await
}

pub(crate) struct UpdateLiveSession {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) scheduled_at: Option<time::PrimitiveDateTime>,
    pub(crate) duration_minutes: Option<i32>,
    pub(crate) meeting_url: Option<String>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateLiveSession,
) -> Result<Option<LiveSession>, sqlx::Error> {
    sqlx::query_as::<_, LiveSession>(&format!(
        "UPDATE live_sessions SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            scheduled_at = COALESCE($3, scheduled_at),
            duration_minutes = COALESCE($4, duration_minutes),
            meeting_url = COALESCE($5, meeting_url),
            updated_at = $6
         WHERE id = $7
         RETURNING {COLUMNS}",
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.scheduled_at)
    .bind(params.duration_minutes)
    .bind(params.meeting_url)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Compare-and-set on the status column so concurrent transitions cannot both win.
pub(crate) async fn transition(
    pool: &PgPool,
    id: &str,
    from: LiveSessionStatus,
    to: LiveSessionStatus,
    updated_at: time::PrimitiveDateTime,
) -> Result<Option<LiveSession>, sqlx::Error> {
    sqlx::query_as::<_, LiveSession>(&format!(
        "UPDATE live_sessions SET status = $1, updated_at = $2
         WHERE id = $3 AND status = $4
         RETURNING {COLUMNS}"
    ))
    .bind(to)
    .bind(updated_at)
    .bind(id)
    .bind(from)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM live_sessions WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
