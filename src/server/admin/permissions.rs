use std::collections::HashMap;
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
use crate::server::dto::{DocumentRef, GrantPermissionRequest, PermissionResponse, ProfileRef};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::types::DocumentPermission;

/// Grants view access on one document to one non-admin user. A second grant
/// for the same pair hits the storage-layer uniqueness constraint and is
/// reported as the distinct "already granted" conflict.
pub async fn grant_permission(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<GrantPermissionRequest>,
) -> impl IntoResponse {
    let doc = state
        .store
        .get_document(&req.document_id)
        .api_err("Failed to get document")?
        .or_not_found("Document not found")?;

    let grantee = state
        .store
        .get_profile(&req.user_id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    if grantee.role.is_admin() {
        return Err(ApiError::bad_request(
            "Cannot grant document access to an admin",
        ));
    }

    let perm = DocumentPermission {
        id: Uuid::new_v4().to_string(),
        document_id: doc.id,
        user_id: grantee.id,
        can_view: true,
        can_edit: false,
        granted_at: Utc::now(),
    };

    match state.store.create_permission(&perm) {
        Ok(()) => {}
        Err(crate::error::Error::AlreadyGranted) => {
            return Err(ApiError::conflict(
                "This user already has access to this document",
            ));
        }
        Err(_) => return Err(ApiError::internal("Failed to grant permission")),
    }

    Ok((StatusCode::CREATED, Json(ApiResponse::success(perm))))
}

pub async fn revoke_permission(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let perm = state
        .store
        .get_permission(&id)
        .api_err("Failed to get permission")?
        .or_not_found("Permission not found")?;

    state
        .store
        .delete_permission(&perm.id)
        .api_err("Failed to revoke permission")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

/// Lists every grant, enriched with the referenced document title and
/// grantee identity. Both references may be null when the referenced row was
/// deleted; dangling rows are served, not skipped. Enrichment is two batch
/// fetches plus an in-memory merge, never a round trip per row.
pub async fn list_permissions(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let perms: Vec<DocumentPermission> = match state.store.list_permissions() {
        Ok(perms) => perms,
        Err(e) => {
            tracing::error!("Failed to list permissions: {e}");
            Vec::new()
        }
    };

    let doc_ids: Vec<String> = {
        let mut ids: Vec<String> = perms.iter().map(|p| p.document_id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    };
    let user_ids: Vec<String> = {
        let mut ids: Vec<String> = perms.iter().map(|p| p.user_id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    };

    let documents = state.store.list_documents_by_ids(&doc_ids).unwrap_or_else(|e| {
        tracing::error!("Failed to enrich permissions with documents: {e}");
        Vec::new()
    });
    let profiles = state.store.list_profiles_by_ids(&user_ids).unwrap_or_else(|e| {
        tracing::error!("Failed to enrich permissions with profiles: {e}");
        Vec::new()
    });

    let titles: HashMap<&str, &str> = documents
        .iter()
        .map(|d| (d.id.as_str(), d.title.as_str()))
        .collect();
    let grantees: HashMap<&str, ProfileRef> = profiles
        .iter()
        .map(|p| (p.id.as_str(), ProfileRef::from(p)))
        .collect();

    let responses: Vec<PermissionResponse> = perms
        .into_iter()
        .map(|perm| {
            let document = titles.get(perm.document_id.as_str()).map(|t| DocumentRef {
                title: (*t).to_string(),
            });
            let grantee = grantees.get(perm.user_id.as_str()).cloned();
            PermissionResponse {
                permission: perm,
                document,
                grantee,
            }
        })
        .collect();

    Json(ApiResponse::success(responses))
}
