use sqlx::PgPool;

use crate::db::models::{Course, RosterEntry};

const COURSE_COLUMNS: &str =
    "id, title, description, teacher_id, classroom_id, is_published, created_at, updated_at";

pub(crate) struct CreateCourse<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) teacher_id: &'a str,
    pub(crate) classroom_id: Option<&'a str>,
    pub(crate) is_published: bool,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) struct UpdateCourse {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) classroom_id: Option<String>,
    pub(crate) is_published: Option<bool>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateCourse<'_>) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "INSERT INTO courses (
            id, title, description, teacher_id, classroom_id, is_published, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$7)
         RETURNING {COURSE_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.teacher_id)
    .bind(params.classroom_id)
    .bind(params.is_published)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    course_id: &str,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"))
        .bind(course_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn update(
    pool: &PgPool,
    course_id: &str,
    params: UpdateCourse,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "UPDATE courses SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            classroom_id = COALESCE($3, classroom_id),
            is_published = COALESCE($4, is_published),
            updated_at = $5
         WHERE id = $6
         RETURNING {COURSE_COLUMNS}",
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.classroom_id)
    .bind(params.is_published)
    .bind(params.updated_at)
    .bind(course_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, course_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM courses WHERE id = $1").bind(course_id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_all(pool: &PgPool, skip: i64, limit: i64) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses ORDER BY created_at DESC, id OFFSET $1 LIMIT $2"
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
) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses WHERE teacher_id = $1
         ORDER BY created_at DESC, id OFFSET $2 LIMIT $3"
    ))
    .bind(teacher_id)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_published(
    pool: &PgPool,
    skip: i64,
    limit: i64,
) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses WHERE is_published
         ORDER BY created_at DESC, id OFFSET $1 LIMIT $2"
    ))
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

/// Published courses the student reaches through an enrollment or a classroom membership.
pub(crate) async fn list_accessible_for_student(
    pool: &PgPool,
    student_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses c
         WHERE c.is_published
           AND (
             EXISTS(SELECT 1 FROM course_enrollments e
                    WHERE e.course_id = c.id AND e.student_id = $1)
             OR EXISTS(SELECT 1 FROM classroom_members m
                       WHERE m.classroom_id = c.classroom_id AND m.student_id = $1)
           )
         ORDER BY c.created_at DESC, c.id OFFSET $2 LIMIT $3"
    ))
    .bind(student_id)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn student_has_access(
    pool: &PgPool,
    course: &Course,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM course_enrollments WHERE course_id = $1 AND student_id = $2)
             OR EXISTS(SELECT 1 FROM classroom_members WHERE classroom_id = $3 AND student_id = $2)",
    )
    .bind(&course.id)
    .bind(student_id)
    .bind(course.classroom_id.as_deref())
    .fetch_one(pool)
    .await
}

pub(crate) async fn enroll(
    pool: &PgPool,
    course_id: &str,
    student_id: &str,
    enrolled_at: time::PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO course_enrollments (course_id, student_id, enrolled_at)
         VALUES ($1, $2, $3)
         ON CONFLICT (course_id, student_id) DO NOTHING",
    )
    .bind(course_id)
    .bind(student_id)
    .bind(enrolled_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn unenroll(
    pool: &PgPool,
    course_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM course_enrollments WHERE course_id = $1 AND student_id = $2")
            .bind(course_id)
            .bind(student_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Enrolled students plus members of the linked classroom, each listed once.
pub(crate) async fn list_students(
    pool: &PgPool,
    course: &Course,
) -> Result<Vec<RosterEntry>, sqlx::Error> {
    sqlx::query_as::<_, RosterEntry>(
        "SELECT DISTINCT ON (u.id) u.id AS student_id, u.email, u.full_name, src.joined_at
         FROM (
             SELECT student_id, enrolled_at AS joined_at FROM course_enrollments WHERE course_id = $1
             UNION ALL
             SELECT student_id, joined_at FROM classroom_members WHERE classroom_id = $2
         ) src
         JOIN users u ON u.id = src.student_id
         ORDER BY u.id, src.joined_at",
    )
    .bind(&course.id)
    .bind(course.classroom_id.as_deref())
    .fetch_all(pool)
    .await
}
