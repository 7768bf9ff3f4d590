use crate::api::errors::ApiError;
use std::path::Path;

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn validate_password_len(password: &str) -> Result<(), ApiError> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )))
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Lower-cased extension of an uploaded file name, without the dot.
pub(crate) fn file_extension(filename: &str) -> Result<String, ApiError> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))
}

pub(crate) fn validate_download_upload(
    filename: &str,
    allowed_extensions: &[String],
) -> Result<String, ApiError> {
    let extension = file_extension(filename)?;

    if allowed_extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(&extension)) {
        Ok(extension)
    } else {
        Err(ApiError::BadRequest(format!("File extension '{extension}' is not allowed")))
    }
}

pub(crate) fn validate_upload_size(size: usize, max_bytes: usize) -> Result<(), ApiError> {
    if size == 0 {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }
    if size > max_bytes {
        return Err(ApiError::BadRequest(format!(
            "File exceeds the maximum upload size of {} MB",
            max_bytes / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Strip directory components and control characters from a client file name.
pub(crate) fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}
