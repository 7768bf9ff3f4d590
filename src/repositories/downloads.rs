use sqlx::PgPool;

use crate::db::models::Download;

const COLUMNS: &str = "id, course_id, title, description, file_key, filename, content_type, \
    file_size, sha256, download_count, uploaded_by, created_at";

pub(crate) struct CreateDownload<'a> {
    pub(crate) id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) file_key: &'a str,
    pub(crate) filename: &'a str,
    pub(crate) content_type: &'a str,
    pub(crate) file_size: i64,
    pub(crate) sha256: &'a str,
    pub(crate) uploaded_by: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateDownload<'_>) -> Result<Download, sqlx::Error> {
    sqlx::query_as::<_, Download>(&format!(
        "INSERT INTO downloads (
            id, course_id, title, description, file_key, filename, content_type,
            file_size, sha256, uploaded_by, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.course_id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.file_key)
    .bind(params.filename)
    .bind(params.content_type)
    .bind(params.file_size)
    .bind(params.sha256)
    .bind(params.uploaded_by)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_in_course(
    pool: &PgPool,
    course_id: &str,
    id: &str,
) -> Result<Option<Download>, sqlx::Error> {
    sqlx::query_as::<_, Download>(&format!(
        "SELECT {COLUMNS} FROM downloads WHERE id = $1 AND course_id = $2"
    ))
    .bind(id)
    .bind(course_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_course(pool: &PgPool, course_id: &str) -> Result<Vec<Download>, sqlx::Error> {
    sqlx::query_as::<_, Download>(&format!(
        "SELECT {COLUMNS} FROM downloads WHERE course_id = $1 ORDER BY created_at DESC, id"
    ))
    .bind(course_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn increment_download_count(pool: &PgPool, id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "UPDATE downloads SET download_count = download_count + 1 WHERE id = $1
         RETURNING download_count",
    )
    .bind(id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM downloads WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
