use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::CreateDocumentRequest;
use crate::server::response::{ApiError, ApiResponse, LIST_LIMIT, StoreOptionExt, StoreResultExt};
use crate::server::validation::{validate_linked_blob_name, validate_title};
use crate::storage::BlobStorageError;
use crate::types::Document;

/// Lists every document record, newest first. A failed fetch degrades to an
/// empty list with a logged diagnostic.
pub async fn list_documents(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let documents: Vec<Document> = match state.store.list_documents(LIST_LIMIT) {
        Ok(documents) => documents,
        Err(e) => {
            tracing::error!("Failed to list documents: {e}");
            Vec::new()
        }
    };

    Json(ApiResponse::success(documents))
}

/// Creates a document record, either linking a bucket blob (the blob's name,
/// size, and MIME type are copied onto the record) or text-only when no
/// `file_name` is given. Validation runs before any store or storage call.
pub async fn create_document(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDocumentRequest>,
) -> impl IntoResponse {
    validate_title(&req.title)?;
    if let Some(ref name) = req.file_name {
        validate_linked_blob_name(name)?;
    }

    let (file_path, file_name, file_size, file_type) = match req.file_name {
        Some(name) => {
            let entry = match state.storage.stat(&name).await {
                Ok(entry) => entry,
                Err(BlobStorageError::NotFound) => {
                    return Err(ApiError::not_found("File does not exist in storage"));
                }
                Err(BlobStorageError::InvalidName) => {
                    return Err(ApiError::bad_request("Invalid file name"));
                }
                Err(e) => {
                    return Err(ApiError::internal(format!("Failed to stat file: {e}")));
                }
            };
            (
                Some(entry.name.clone()),
                Some(entry.name),
                Some(entry.size),
                Some(entry.content_type),
            )
        }
        None => (None, None, None, None),
    };

    let doc = Document {
        id: Uuid::new_v4().to_string(),
        title: req.title,
        content: req.content.filter(|c| !c.is_empty()),
        file_path,
        file_name,
        file_size,
        file_type,
        owner_id: admin.0.profile.id.clone(),
        created_at: Utc::now(),
    };

    state
        .store
        .create_document(&doc)
        .api_err("Failed to create document")?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(doc))))
}

/// Deletes the record only. The underlying blob stays in the bucket, and any
/// permission rows referencing the document are left dangling on purpose.
pub async fn delete_document(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let doc = state
        .store
        .get_document(&id)
        .api_err("Failed to get document")?
        .or_not_found("Document not found")?;

    state
        .store
        .delete_document(&doc.id)
        .api_err("Failed to delete document")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
