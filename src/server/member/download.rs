use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use tokio_util::io::ReaderStream;

use crate::auth::RequireIdentity;
use crate::server::AppState;
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::storage::BlobStorageError;
use crate::types::Document;

/// Downloads a document. Admins may fetch any document; everyone else needs
/// a view grant, checked before any storage access. Documents with a linked
/// blob stream the blob; text-only documents get a synthesized export that
/// never touches the bucket.
pub async fn download_document(
    identity: RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let profile = &identity.0.profile;

    let doc = state
        .store
        .get_document(&id)
        .api_err("Failed to get document")?
        .or_not_found("Document not found")?;

    if !profile.role.is_admin() {
        let grant = state
            .store
            .get_permission_for_pair(&doc.id, &profile.id)
            .api_err("Failed to check permission")?;

        if !grant.is_some_and(|g| g.can_view) {
            return Err(ApiError::forbidden("You do not have access to this document"));
        }
    }

    match doc.file_path {
        Some(ref file_path) => stream_blob(&state, &doc, file_path).await,
        None => text_export(&state, &doc),
    }
}

async fn stream_blob(
    state: &Arc<AppState>,
    doc: &Document,
    file_path: &str,
) -> Result<Response, ApiError> {
    let (reader, size) = match state.storage.open(file_path).await {
        Ok(result) => result,
        Err(BlobStorageError::NotFound) => {
            return Err(ApiError::not_found("File is missing from storage"));
        }
        Err(BlobStorageError::InvalidName) => {
            return Err(ApiError::bad_request("Invalid file path on document"));
        }
        Err(e) => {
            tracing::warn!("Storage error while downloading {file_path}: {e}");
            return Err(ApiError::internal(format!("Download failed: {e}")));
        }
    };

    let content_type = doc
        .file_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let download_name = doc.file_name.as_deref().unwrap_or(file_path);

    let stream = ReaderStream::new(reader);
    let body = Body::from_stream(stream);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, size)
        .header(header::CONTENT_DISPOSITION, attachment_disposition(download_name))
        .header("X-Content-Type-Options", "nosniff")
        .body(body)
        .map_err(|_| ApiError::internal("Failed to build response"))
}

/// Plain-text rendering of a blob-less document: title, creation time, owner
/// email, and content. No storage call happens on this path.
fn text_export(state: &Arc<AppState>, doc: &Document) -> Result<Response, ApiError> {
    let owner_email = state
        .store
        .get_profile(&doc.owner_id)
        .ok()
        .flatten()
        .map(|p| p.email)
        .unwrap_or_else(|| "unknown".to_string());

    let body = format!(
        "Title: {}\nCreated: {}\nOwner: {}\n\nContent:\n{}\n",
        doc.title,
        doc.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        owner_email,
        doc.content.as_deref().unwrap_or("(no content)"),
    );

    let filename = format!("{}.txt", doc.title);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CONTENT_LENGTH, body.len())
        .header(header::CONTENT_DISPOSITION, attachment_disposition(&filename))
        .body(Body::from(body))
        .map_err(|_| ApiError::internal("Failed to build response"))
}

/// Builds an attachment Content-Disposition carrying an ASCII-sanitized
/// fallback plus an RFC 5987 `filename*` so non-ASCII names survive.
fn attachment_disposition(filename: &str) -> HeaderValue {
    let safe_filename: String = filename
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
        .collect();
    let safe_filename = if safe_filename.is_empty() {
        "download".to_string()
    } else {
        safe_filename
    };

    let value = if filename.is_ascii() {
        format!("attachment; filename=\"{safe_filename}\"")
    } else {
        format!(
            "attachment; filename=\"{safe_filename}\"; filename*=UTF-8''{}",
            urlencoding::encode(filename)
        )
    };

    HeaderValue::from_str(&value)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"download\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_ascii() {
        let value = attachment_disposition("report.pdf");
        assert_eq!(value.to_str().unwrap(), "attachment; filename=\"report.pdf\"");
    }

    #[test]
    fn test_disposition_strips_quotes_and_separators() {
        let value = attachment_disposition("a\"b/c.txt");
        assert_eq!(value.to_str().unwrap(), "attachment; filename=\"abc.txt\"");
    }

    #[test]
    fn test_disposition_non_ascii_adds_encoded_name() {
        let value = attachment_disposition("季度报告.txt");
        let s = value.to_str().unwrap();
        assert!(s.contains("filename*=UTF-8''"));
        assert!(s.starts_with("attachment; filename=\""));
    }
}
