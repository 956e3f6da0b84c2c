use crate::server::response::ApiError;
use crate::storage::is_valid_blob_name;

const MAX_TITLE_LEN: usize = 200;

/// Titles are required and human-facing; only length and non-emptiness are
/// enforced.
pub fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::bad_request("Title cannot be empty"));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(ApiError::bad_request(format!(
            "Title cannot exceed {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_linked_blob_name(name: &str) -> Result<(), ApiError> {
    if !is_valid_blob_name(name) {
        return Err(ApiError::bad_request("Invalid file name"));
    }
    Ok(())
}
