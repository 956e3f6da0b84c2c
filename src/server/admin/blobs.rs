use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::response::ApiResponse;
use crate::storage::{BLOB_LIST_LIMIT, BlobEntry};

/// Lists up to 100 bucket blobs sorted by name; hidden entries are filtered
/// out by the storage layer. A failed listing degrades to an empty list with
/// a logged diagnostic.
pub async fn list_blobs(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let blobs: Vec<BlobEntry> = match state.storage.list(BLOB_LIST_LIMIT).await {
        Ok(blobs) => blobs,
        Err(e) => {
            tracing::error!("Failed to list storage bucket: {e}");
            Vec::new()
        }
    };

    Json(ApiResponse::success(blobs))
}
