//! Admin login and logout.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAdmin, clear_admin, set_admin, verify_admin_secret};
use crate::state::AppState;

/// `POST /admin/login` body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub secret: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// `POST /admin/login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<StatusCode> {
    if !verify_admin_secret(&state.config().admin_secret, &request.secret) {
        warn!("Admin login failed");
        return Err(AppError::Unauthorized("invalid secret".to_string()));
    }

    set_admin(&session).await?;
    add_breadcrumb("auth", "Admin logged in", None);
    info!("Admin logged in");

    Ok(StatusCode::NO_CONTENT)
}

/// `POST /admin/logout`
#[instrument(skip_all)]
pub async fn logout(RequireAdmin(session): RequireAdmin) -> Result<StatusCode> {
    clear_admin(&session).await?;
    info!("Admin logged out");
    Ok(StatusCode::NO_CONTENT)
}
