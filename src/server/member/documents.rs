use std::collections::HashMap;
use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::RequireIdentity;
use crate::server::AppState;
use crate::server::dto::{DocumentResponse, ProfileRef};
use crate::server::response::ApiResponse;

/// The caller's granted document set, resolved in two steps because the
/// store exposes no join: grant rows project document ids, then the
/// documents and their distinct owners are batch-fetched and merged locally.
/// Dangling grant ids simply drop out of the membership fetch. Applies to
/// admins and members alike: visibility is exactly the grant set.
pub async fn list_granted_documents(
    identity: RequireIdentity,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let user_id = &identity.0.profile.id;

    let document_ids = match state.store.list_viewable_document_ids(user_id) {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!("Failed to list grants for {user_id}: {e}");
            Vec::new()
        }
    };

    // No grants is an empty result, not an error.
    if document_ids.is_empty() {
        return Json(ApiResponse::success(Vec::<DocumentResponse>::new()));
    }

    let mut documents = match state.store.list_documents_by_ids(&document_ids) {
        Ok(docs) => docs,
        Err(e) => {
            tracing::error!("Failed to fetch granted documents for {user_id}: {e}");
            Vec::new()
        }
    };
    documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let owner_ids: Vec<String> = {
        let mut ids: Vec<String> = documents.iter().map(|d| d.owner_id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    };

    let owners: HashMap<String, ProfileRef> = state
        .store
        .list_profiles_by_ids(&owner_ids)
        .unwrap_or_else(|e| {
            tracing::error!("Failed to fetch document owners: {e}");
            Vec::new()
        })
        .iter()
        .map(|p| (p.id.clone(), ProfileRef::from(p)))
        .collect();

    let responses: Vec<DocumentResponse> = documents
        .into_iter()
        .map(|doc| {
            let owner = owners.get(&doc.owner_id).cloned();
            DocumentResponse {
                document: doc,
                owner,
            }
        })
        .collect();

    Json(ApiResponse::success(responses))
}
