mod blobs;
mod documents;
mod permissions;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // User directory
        .route("/users", get(users::list_users))
        // Document directory
        .route("/documents", get(documents::list_documents))
        .route("/documents", post(documents::create_document))
        .route("/documents/{id}", delete(documents::delete_document))
        // Bucket listing
        .route("/blobs", get(blobs::list_blobs))
        // Permission registry
        .route("/permissions", get(permissions::list_permissions))
        .route("/permissions", post(permissions::grant_permission))
        .route(
            "/permissions/{id}",
            delete(permissions::revoke_permission),
        )
}
