//! Promotional content for the storefront home page.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::db::{BannerRepository, FeatureIconRepository};
use crate::error::Result;
use crate::models::{Banner, FeatureIcon};
use crate::state::AppState;

/// `GET /api/banners` - active banners by position.
#[instrument(skip(state))]
pub async fn banners(State(state): State<AppState>) -> Result<Json<Vec<Banner>>> {
    Ok(Json(BannerRepository::new(state.pool()).list(true).await?))
}

/// `GET /api/feature-icons` - active feature icons by position.
#[instrument(skip(state))]
pub async fn feature_icons(State(state): State<AppState>) -> Result<Json<Vec<FeatureIcon>>> {
    Ok(Json(FeatureIconRepository::new(state.pool()).list(true).await?))
}
