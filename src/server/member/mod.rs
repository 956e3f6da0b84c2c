mod documents;
mod download;

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::server::AppState;

pub fn member_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/documents", get(documents::list_granted_documents))
        .route(
            "/documents/{id}/download",
            get(download::download_document),
        )
}
