use sqlx::PgPool;

use crate::db::models::{Classroom, RosterEntry};

const COLUMNS: &str = "id, name, description, teacher_id, join_code, created_at, updated_at";

pub(crate) struct CreateClassroom<'a> {
    pub(crate) id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) teacher_id: &'a str,
    pub(crate) join_code: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateClassroom<'_>,
) -> Result<Classroom, sqlx::Error> {
    sqlx::query_as::<_, Classroom>(&format!(
        "INSERT INTO classrooms (id, name, description, teacher_id, join_code, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$6,$6)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.description)
    .bind(params.teacher_id)
    .bind(params.join_code)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Classroom>, sqlx::Error> {
    sqlx::query_as::<_, Classroom>(&format!("SELECT {COLUMNS} FROM classrooms WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_join_code(
    pool: &PgPool,
    join_code: &str,
) -> Result<Option<Classroom>, sqlx::Error> {
    sqlx::query_as::<_, Classroom>(&format!(
        "SELECT {COLUMNS} FROM classrooms WHERE join_code = upper($1)"
    ))
    .bind(join_code.trim())
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_all(pool: &PgPool, skip: i64, limit: i64) -> Result<Vec<Classroom>, sqlx::Error> {
    sqlx::query_as::<_, Classroom>(&format!(
        "SELECT {COLUMNS} FROM classrooms ORDER BY created_at DESC, id OFFSET $1 LIMIT $2"
    ))
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_teacher(
    pool: &PgPool,
    teacher_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<Classroom>, sqlx::Error> {
    sqlx::query_as::<_, Classroom>(&format!(
        "SELECT {COLUMNS} FROM classrooms WHERE teacher_id = $1
         ORDER BY created_at DESC, id OFFSET $2 LIMIT $3"
    ))
    .bind(teacher_id)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_member(
    pool: &PgPool,
    student_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<Classroom>, sqlx::Error> {
    sqlx::query_as::<_, Classroom>(
        "SELECT c.id, c.name, c.description, c.teacher_id, c.join_code, c.created_at, c.updated_at
         FROM classrooms c
         JOIN classroom_members m ON m.classroom_id = c.id
         WHERE m.student_id = $1
         ORDER BY m.joined_at DESC, c.id OFFSET $2 LIMIT $3",
    )
    .bind(student_id)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) struct UpdateClassroom {
    pub(crate) name: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateClassroom,
) -> Result<Option<Classroom>, sqlx::Error> {
    sqlx::query_as::<_, Classroom>(&format!(
        "UPDATE classrooms SET
            name = COALESCE($1, name),
            description = COALESCE($2, description),
            updated_at = $3
         WHERE id = $4
         RETURNING {COLUMNS}",
    ))
    .bind(params.name)
    .bind(params.description)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn set_join_code(
    pool: &PgPool,
    id: &str,
    join_code: &str,
    updated_at: time::PrimitiveDateTime,
) -> Result<Option<Classroom>, sqlx::Error> {
    sqlx::query_as::<_, Classroom>(&format!(
        "UPDATE classrooms SET join_code = $1, updated_at = $2 WHERE id = $3 RETURNING {COLUMNS}"
    ))
    .bind(join_code)
    .bind(updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM classrooms WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// Returns `true` when a new membership row was written.
pub(crate) async fn add_member(
    pool: &PgPool,
    classroom_id: &str,
    student_id: &str,
    joined_at: time::PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO classroom_members (classroom_id, student_id, joined_at)
         VALUES ($1, $2, $3)
         ON CONFLICT (classroom_id, student_id) DO NOTHING",
    )
    .bind(classroom_id)
    .bind(student_id)
    .bind(joined_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn remove_member(
    pool: &PgPool,
    classroom_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM classroom_members WHERE classroom_id = $1 AND student_id = $2")
            .bind(classroom_id)
            .bind(student_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn is_member(
    pool: &PgPool,
    classroom_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
            SELECT 1 FROM classroom_members WHERE classroom_id = $1 AND student_id = $2
         )",
    )
    .bind(classroom_id)
    .bind(student_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_members(
    pool: &PgPool,
    classroom_id: &str,
) -> Result<Vec<RosterEntry>, sqlx::Error> {
    sqlx::query_as::<_, RosterEntry>(
        "SELECT u.id AS student_id, u.email, u.full_name, m.joined_at
         FROM classroom_members m
         JOIN users u ON u.id = m.student_id
         WHERE m.classroom_id = $1
         ORDER BY u.full_name, u.id",
    )
    .bind(classroom_id)
    .fetch_all(pool)
    .await
}
