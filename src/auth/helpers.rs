use std::sync::Arc;

use chrono::Utc;

use super::{TokenGenerator, parse_token};
use crate::server::AppState;
use crate::types::{Profile, Session};

#[derive(Debug)]
pub enum AuthValidationError {
    InvalidScheme,
    InvalidCredentials,
    SessionExpired,
}

/// Credentials presented in the Authorization header.
pub enum Credentials {
    /// Bearer <session token>
    Bearer(String),
    /// Basic base64(email:password), for scripted access without a session.
    Basic { email: String, password: String },
}

/// Extracts credentials from an Authorization header.
/// Returns None if no auth header is present.
/// Returns Err if the auth scheme is unsupported or malformed.
pub fn extract_credentials(
    auth_header: Option<&str>,
) -> Result<Option<Credentials>, AuthValidationError> {
    match auth_header {
        Some(header) if header.starts_with("Bearer ") => {
            let token = header.strip_prefix("Bearer ").unwrap().to_string();
            Ok(Some(Credentials::Bearer(token)))
        }
        Some(header) if header.starts_with("Basic ") => decode_basic(header)
            .ok_or(AuthValidationError::InvalidCredentials)
            .map(Some),
        Some(_) => Err(AuthValidationError::InvalidScheme),
        None => Ok(None),
    }
}

/// Decodes a Basic auth header into email/password credentials.
/// Expects format: Basic base64(email:password)
fn decode_basic(header: &str) -> Option<Credentials> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    let (email, password) = credentials.split_once(':')?;
    if email.is_empty() {
        return None;
    }

    Some(Credentials::Basic {
        email: email.to_string(),
        password: password.to_string(),
    })
}

/// Validates a raw session token against the store and resolves the profile
/// it belongs to. Any store failure is treated as invalid credentials; the
/// resolver fails closed rather than distinguishing backend trouble from a
/// bad token.
pub fn validate_bearer(
    state: &Arc<AppState>,
    raw_token: &str,
) -> Result<(Session, Profile), AuthValidationError> {
    let (lookup, _secret) =
        parse_token(raw_token).map_err(|_| AuthValidationError::InvalidCredentials)?;

    let session = state
        .store
        .get_session_by_lookup(&lookup)
        .map_err(|_| AuthValidationError::InvalidCredentials)?
        .ok_or(AuthValidationError::InvalidCredentials)?;

    let generator = TokenGenerator::new();
    if !generator
        .verify(raw_token, &session.token_hash)
        .map_err(|_| AuthValidationError::InvalidCredentials)?
    {
        return Err(AuthValidationError::InvalidCredentials);
    }

    if let Some(expires_at) = &session.expires_at {
        if expires_at < &Utc::now() {
            return Err(AuthValidationError::SessionExpired);
        }
    }

    let profile = state
        .store
        .get_profile(&session.user_id)
        .map_err(|_| AuthValidationError::InvalidCredentials)?
        .ok_or(AuthValidationError::InvalidCredentials)?;

    if let Err(e) = state.store.update_session_last_used(&session.id) {
        tracing::warn!("Failed to update session last_used_at: {e}");
    }

    Ok((session, profile))
}

/// Validates email/password credentials against the profile row.
pub fn validate_basic(
    state: &Arc<AppState>,
    email: &str,
    password: &str,
) -> Result<Profile, AuthValidationError> {
    let profile = state
        .store
        .get_profile_by_email(email)
        .map_err(|_| AuthValidationError::InvalidCredentials)?
        .ok_or(AuthValidationError::InvalidCredentials)?;

    let generator = TokenGenerator::new();
    if !generator
        .verify(password, &profile.password_hash)
        .map_err(|_| AuthValidationError::InvalidCredentials)?
    {
        return Err(AuthValidationError::InvalidCredentials);
    }

    Ok(profile)
}
