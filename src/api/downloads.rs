use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{require_course_manager, require_course_reader, CurrentUser};
use crate::api::uploads::{presigned_ttl, read_multipart, require_storage};
use crate::api::validation::{sanitize_filename, validate_download_upload, validate_upload_size};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Download;
use crate::repositories;
use crate::schemas::download::{DownloadResponse, DownloadUrlResponse};
use crate::services::storage::{content_type_for, download_key};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_downloads).post(upload_download))
        .route("/:download_id", get(get_download).delete(delete_download))
        .route("/:download_id/url", get(download_url))
}

async fn list_downloads(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<DownloadResponse>>, ApiError> {
    let access = require_course_reader(&state, &user, &course_id).await?;

    let downloads = repositories::downloads::list_by_course(state.db(), &access.course.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list downloads"))?;

    Ok(Json(downloads.into_iter().map(DownloadResponse::from_db).collect()))
}

/// Multipart form with `title`, optional `description` and one `file`.
async fn upload_download(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<DownloadResponse>), ApiError> {
    let course = require_course_manager(&state, &user, &course_id).await?;
    let storage = require_storage(&state)?;
    let storage_settings = state.settings().storage();

    let mut form = read_multipart(multipart, storage_settings.max_upload_bytes()).await?;
    let title = form
        .text("title")
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest("title is required".to_string()))?;
    if title.chars().count() > 255 {
        return Err(ApiError::BadRequest("title must be at most 255 characters".to_string()));
    }
    let description = form.text("description").map(str::to_string);
    let file =
        form.file.take().ok_or_else(|| ApiError::BadRequest("file is required".to_string()))?;

    let extension =
        validate_download_upload(&file.filename, &storage_settings.allowed_download_extensions)?;
    validate_upload_size(file.bytes.len(), storage_settings.max_upload_bytes())?;

    let download_id = Uuid::new_v4().to_string();
    let key = download_key(&course.id, &download_id, &extension);
    let content_type =
        file.content_type.clone().unwrap_or_else(|| content_type_for(&extension).to_string());

    let stored = storage
        .upload_bytes(&key, &content_type, file.bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store file"))?;

    let created = repositories::downloads::create(
        state.db(),
        repositories::downloads::CreateDownload {
            id: &download_id,
            course_id: &course.id,
            title: &title,
            description: description.as_deref(),
            file_key: &key,
            filename: &sanitize_filename(&file.filename),
            content_type: &content_type,
            file_size: stored.size,
            sha256: &stored.sha256,
            uploaded_by: &user.id,
            created_at: primitive_now_utc(),
        },
    )
    .await;

    let download = match created {
        Ok(download) => download,
        Err(err) => {
            if let Err(cleanup) = storage.delete_object(&key).await {
                tracing::warn!(error = %cleanup, file_key = %key, "Failed to remove orphaned upload");
            }
            return Err(ApiError::internal(err, "Failed to save download"));
        }
    };

    tracing::info!(
        user_id = %user.id,
        course_id = %course.id,
        download_id = %download.id,
        file_size = download.file_size,
        action = "download_upload",
        "Course file uploaded"
    );

    Ok((StatusCode::CREATED, Json(DownloadResponse::from_db(download))))
}

async fn get_download(
    Path((course_id, download_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let access = require_course_reader(&state, &user, &course_id).await?;
    let download = load_download(&state, &access.course.id, &download_id).await?;
    Ok(Json(DownloadResponse::from_db(download)))
}

async fn download_url(
    Path((course_id, download_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<DownloadUrlResponse>, ApiError> {
    let access = require_course_reader(&state, &user, &course_id).await?;
    let download = load_download(&state, &access.course.id, &download_id).await?;
    let storage = require_storage(&state)?;

    let ttl = presigned_ttl(&state);
    let url = storage
        .presign_get(&download.file_key, Some(&download.filename), ttl)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to generate download URL"))?;

    let download_count = repositories::downloads::increment_download_count(state.db(), &download.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to record download"))?;

    Ok(Json(DownloadUrlResponse {
        url,
        filename: download.filename,
        expires_in_seconds: ttl.as_secs(),
        download_count,
    }))
}

async fn delete_download(
    Path((course_id, download_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let course = require_course_manager(&state, &user, &course_id).await?;
    let download = load_download(&state, &course.id, &download_id).await?;

    repositories::downloads::delete(state.db(), &download.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete download"))?;

    if let Some(storage) = state.storage() {
        if let Err(err) = storage.delete_object(&download.file_key).await {
            tracing::warn!(error = %err, file_key = %download.file_key, "Failed to remove download object");
        }
    }

    tracing::info!(
        user_id = %user.id,
        download_id = %download.id,
        action = "download_delete",
        "Course file deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn load_download(
    state: &AppState,
    course_id: &str,
    download_id: &str,
) -> Result<Download, ApiError> {
    repositories::downloads::find_in_course(state.db(), course_id, download_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch download"))?
        .ok_or_else(|| ApiError::NotFound("Download not found".to_string()))
}
