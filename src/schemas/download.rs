use serde::Serialize;

use crate::core::time::format_primitive;

#[derive(Debug, Serialize)]
pub(crate) struct DownloadResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) filename: String,
    pub(crate) content_type: String,
    pub(crate) file_size: i64,
    pub(crate) sha256: String,
    pub(crate) download_count: i64,
    pub(crate) uploaded_by: String,
    pub(crate) created_at: String,
}

impl DownloadResponse {
    pub(crate) fn from_db(download: crate::db::models::Download) -> Self {
        Self {
            id: download.id,
            course_id: download.course_id,
            title: download.title,
            description: download.description,
            filename: download.filename,
            content_type: download.content_type,
            file_size: download.file_size,
            sha256: download.sha256,
            download_count: download.download_count,
            uploaded_by: download.uploaded_by,
            created_at: format_primitive(download.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DownloadUrlResponse {
    pub(crate) url: String,
    pub(crate) filename: String,
    pub(crate) expires_in_seconds: u64,
    pub(crate) download_count: i64,
}
