use sqlx::PgPool;

use crate::db::models::Assignment;

const COLUMNS: &str = "id, course_id, title, description, due_at, max_points, allow_late, \
    is_published, created_by, created_at, updated_at";

pub(crate) struct CreateAssignment<'a> {
    pub(crate) id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) due_at: Option<time::PrimitiveDateTime>,
    pub(crate) max_points: f64,
    pub(crate) allow_late: bool,
    pub(crate) is_published: bool,
    pub(crate) created_by: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateAssignment<'_>,
) -> Result<Assignment, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "INSERT INTO assignments (
            id, course_id, title, description, due_at, max_points, allow_late,
            is_published, created_by, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$10)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.course_id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.due_at)
    .bind(params.max_points)
    .bind(params.allow_late)
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
) -> Result<Option<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "SELECT {COLUMNS} FROM assignments WHERE id = $1 AND course_id = $2"
    ))
    .bind(id)
    .bind(course_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_course(
    pool: &PgPool,
    course_id: &str,
    published_only: bool,
) -> Result<Vec<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "SELECT {COLUMNS} FROM assignments
         WHERE course_id = $1 AND (is_published OR NOT $2)
         ORDER BY due_at ASC NULLS LAST, created_at ASC"
    ))
    .bind(course_id)
    .bind(published_only)
    .fetch_all(pool)
    .await
}

pub(crate) struct UpdateAssignment {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) due_at: Option<time::PrimitiveDateTime>,
    pub(crate) max_points: Option<f64>,
    pub(crate) allow_late: Option<bool>,
    pub(crate) is_published: Option<bool>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateAssignment,
) -> Result<Option<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "UPDATE assignments SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            due_at = COALESCE($3, due_at),
            max_points = COALESCE($4, max_points),
            allow_late = COALESCE($5, allow_late),
            is_published = COALESCE($6, is_published),
            updated_at = $7
         WHERE id = $8
         RETURNING {COLUMNS}",
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.due_at)
    .bind(params.max_points)
    .bind(params.allow_late)
    .bind(params.is_published)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM assignments WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// Highest grade already recorded; lowering `max_points` below it is refused.
pub(crate) async fn max_awarded_points(pool: &PgPool, id: &str) -> Result<Option<f64>, sqlx::Error> {
    sqlx::query_scalar::<_, Option<f64>>(
        "SELECT MAX(points) FROM assignment_submissions WHERE assignment_id = $1",
    )
    .bind(id)
    .fetch_one(pool)
    .await
}
