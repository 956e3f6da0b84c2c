use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::helpers::{AuthValidationError, Credentials, extract_credentials, validate_basic, validate_bearer};
use crate::server::AppState;
use crate::types::{Profile, Session};

/// A resolved caller: the profile plus the session it came in on.
/// `session` is None for Basic-authenticated requests.
pub struct Identity {
    pub profile: Profile,
    pub session: Option<Session>,
}

/// Extractor that requires any authenticated identity
pub struct RequireIdentity(pub Identity);

/// Extractor that requires an identity whose role is admin.
/// The role check happens here, before any handler-level fetch runs.
pub struct RequireAdmin(pub Identity);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidCredentials,
    SessionExpired,
    NotAdmin,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials"),
            AuthError::SessionExpired => (StatusCode::UNAUTHORIZED, "Session expired"),
            AuthError::NotAdmin => (StatusCode::FORBIDDEN, "Admin access required"),
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                "WWW-Authenticate",
                "Bearer realm=\"docvault\"".parse().unwrap(),
            );
        }

        response
    }
}

impl From<AuthValidationError> for AuthError {
    fn from(e: AuthValidationError) -> Self {
        match e {
            AuthValidationError::InvalidScheme => AuthError::InvalidScheme,
            AuthValidationError::InvalidCredentials => AuthError::InvalidCredentials,
            AuthValidationError::SessionExpired => AuthError::SessionExpired,
        }
    }
}

impl FromRequestParts<Arc<AppState>> for RequireIdentity {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = resolve_identity(parts, state)?;
        Ok(RequireIdentity(identity))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = resolve_identity(parts, state)?;

        if !identity.profile.role.is_admin() {
            return Err(AuthError::NotAdmin);
        }

        Ok(RequireAdmin(identity))
    }
}

fn resolve_identity(parts: &mut Parts, state: &Arc<AppState>) -> Result<Identity, AuthError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let credentials = extract_credentials(auth_header)
        .map_err(AuthError::from)?
        .ok_or(AuthError::MissingAuth)?;

    match credentials {
        Credentials::Bearer(raw_token) => {
            let (session, profile) = validate_bearer(state, &raw_token)?;
            Ok(Identity {
                profile,
                session: Some(session),
            })
        }
        Credentials::Basic { email, password } => {
            let profile = validate_basic(state, &email, &password)?;
            Ok(Identity {
                profile,
                session: None,
            })
        }
    }
}
