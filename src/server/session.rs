use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{RequireIdentity, TokenGenerator};
use crate::server::AppState;
use crate::server::dto::{LoginRequest, LoginResponse};
use crate::server::response::{ApiError, ApiResponse};
use crate::types::Session;

const SESSION_TTL_DAYS: i64 = 30;

pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    // One message for unknown email and wrong password alike.
    let profile = state
        .store
        .get_profile_by_email(&req.email)
        .map_err(|_| ApiError::unauthorized("Invalid email or password"))?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let generator = TokenGenerator::new();
    let verified = generator
        .verify(&req.password, &profile.password_hash)
        .map_err(|_| ApiError::unauthorized("Invalid email or password"))?;
    if !verified {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let expires_at = Some(Utc::now() + Duration::days(SESSION_TTL_DAYS));

    const MAX_RETRIES: u32 = 3;
    for _ in 0..MAX_RETRIES {
        let (raw_token, lookup, hash) = generator
            .generate()
            .map_err(|_| ApiError::internal("Failed to generate session token"))?;

        let session = Session {
            id: Uuid::new_v4().to_string(),
            token_hash: hash,
            token_lookup: lookup,
            user_id: profile.id.clone(),
            created_at: Utc::now(),
            expires_at,
            last_used_at: None,
        };

        match state.store.create_session(&session) {
            Ok(()) => {
                return Ok(Json(ApiResponse::success(LoginResponse {
                    token: raw_token,
                    profile: profile.clone(),
                })));
            }
            Err(crate::error::Error::SessionLookupCollision) => continue,
            Err(_) => return Err(ApiError::internal("Failed to create session")),
        }
    }

    Err(ApiError::internal("Failed to create session after retries"))
}

async fn logout(
    identity: RequireIdentity,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    // Basic-authenticated callers have no session row to remove.
    if let Some(session) = identity.0.session {
        if let Err(e) = state.store.delete_session(&session.id) {
            tracing::warn!("Failed to delete session {}: {e}", session.id);
        }
    }

    StatusCode::NO_CONTENT
}

async fn me(identity: RequireIdentity) -> impl IntoResponse {
    Json(ApiResponse::success(identity.0.profile))
}
