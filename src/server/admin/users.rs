use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::response::{ApiResponse, LIST_LIMIT};
use crate::types::Profile;

/// Lists every profile, newest first. A failed fetch degrades to an empty
/// list with a logged diagnostic rather than an error response.
pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let users: Vec<Profile> = match state.store.list_profiles(LIST_LIMIT) {
        Ok(users) => users,
        Err(e) => {
            tracing::error!("Failed to list users: {e}");
            Vec::new()
        }
    };

    Json(ApiResponse::success(users))
}
