//! Admin gate.
//!
//! `POST /admin/login` checks the submitted secret against
//! `SHOP_ADMIN_SECRET` and marks the session as admin. Every other admin
//! route sits behind [`require_admin`], which answers 401 without that flag.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::session_keys;

/// Compare a submitted secret with the configured one.
///
/// Both sides are hashed first so the comparison always runs over 32 bytes,
/// whatever the input length.
#[must_use]
pub fn verify_admin_secret(expected: &SecretString, submitted: &str) -> bool {
    let expected = Sha256::digest(expected.expose_secret().as_bytes());
    let submitted = Sha256::digest(submitted.as_bytes());

    expected
        .iter()
        .zip(submitted.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Whether the session carries the admin flag.
async fn is_admin(session: &Session) -> Result<bool, AppError> {
    session
        .get::<bool>(session_keys::IS_ADMIN)
        .await
        .map(|flag| flag.unwrap_or(false))
        .map_err(|e| AppError::Internal(format!("session read failed: {e}")))
}

/// Mark the session as admin, rotating its ID.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::IS_ADMIN, true).await
}

/// Drop the admin flag (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<bool>(session_keys::IS_ADMIN).await?;
    Ok(())
}

/// Middleware rejecting requests without an admin session.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` when the flag is missing.
pub async fn require_admin(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !is_admin(&session).await? {
        return Err(AppError::Unauthorized("admin login required".to_string()));
    }
    Ok(next.run(request).await)
}

/// Extractor for handlers that must only run for admins.
///
/// Used where a route is not covered by [`require_admin`], such as logout.
pub struct RequireAdmin(pub Session);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Unauthorized("no session".to_string()))?;

        if !is_admin(&session).await? {
            return Err(AppError::Unauthorized("admin login required".to_string()));
        }
        Ok(Self(session))
    }
}
