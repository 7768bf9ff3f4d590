use std::collections::HashMap;
use std::time::Duration;

use axum::extract::Multipart;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::services::storage::StorageService;

#[derive(Debug)]
pub(crate) struct UploadedFile {
    pub(crate) filename: String,
    pub(crate) content_type: Option<String>,
    pub(crate) bytes: Vec<u8>,
}

/// Text fields plus at most one `file` part.
#[derive(Debug, Default)]
pub(crate) struct MultipartForm {
    pub(crate) fields: HashMap<String, String>,
    pub(crate) file: Option<UploadedFile>,
}

impl MultipartForm {
    pub(crate) fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str).map(str::trim).filter(|value| !value.is_empty())
    }
}

pub(crate) async fn read_multipart(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<MultipartForm, ApiError> {
    let mut form = MultipartForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            if form.file.is_some() {
                return Err(ApiError::BadRequest("Only one file can be uploaded".to_string()));
            }
            let filename = field
                .file_name()
                .map(|s| s.to_string())
                .ok_or_else(|| ApiError::BadRequest("File name is required".to_string()))?;
            let content_type = field.content_type().map(|s| s.to_string());

            let mut bytes = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
            {
                if bytes.len() + chunk.len() > max_bytes {
                    return Err(ApiError::BadRequest(format!(
                        "File exceeds the maximum upload size of {} MB",
                        max_bytes / (1024 * 1024)
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }

            form.file = Some(UploadedFile { filename, content_type, bytes });
        } else if !name.is_empty() {
            let text = field
                .text()
                .await
                .map_err(|_| ApiError::BadRequest(format!("Invalid value for '{name}'")))?;
            form.fields.insert(name, text);
        }
    }

    Ok(form)
}

pub(crate) fn require_storage(state: &AppState) -> Result<&StorageService, ApiError> {
    state
        .storage()
        .ok_or_else(|| ApiError::ServiceUnavailable("File storage is not configured".to_string()))
}

/// Best-effort removal of objects whose rows are already gone.
pub(crate) async fn remove_objects(state: &AppState, keys: &[String], reason: &str) {
    let Some(storage) = state.storage() else {
        return;
    };
    for key in keys {
        if let Err(err) = storage.delete_object(key).await {
            tracing::warn!(error = %err, file_key = %key, reason, "Failed to remove stored object");
        }
    }
}

pub(crate) fn presigned_ttl(state: &AppState) -> Duration {
    Duration::from_secs(state.settings().storage().presigned_url_expire_minutes * 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_fields_read_as_missing() {
        let mut form = MultipartForm::default();
        form.fields.insert("title".into(), "  Syllabus ".into());
        form.fields.insert("description".into(), "   ".into());

        assert_eq!(form.text("title"), Some("Syllabus"));
        assert_eq!(form.text("description"), None);
        assert_eq!(form.text("missing"), None);
    }
}
