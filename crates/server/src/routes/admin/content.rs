//! Admin management of banners and feature icons.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use shoply_core::{BannerId, FeatureIconId};
use tracing::{info, instrument};

use crate::db::{BannerRepository, FeatureIconRepository};
use crate::error::{AppError, Result};
use crate::models::{Banner, BannerInput, FeatureIcon, FeatureIconInput};
use crate::state::AppState;

// =============================================================================
// Banners
// =============================================================================

/// `GET /admin/api/banners` - all banners, active or not.
#[instrument(skip(state))]
pub async fn list_banners(State(state): State<AppState>) -> Result<Json<Vec<Banner>>> {
    Ok(Json(BannerRepository::new(state.pool()).list(false).await?))
}

#[instrument(skip(state), fields(banner_id = %id))]
pub async fn show_banner(
    State(state): State<AppState>,
    Path(id): Path<BannerId>,
) -> Result<Json<Banner>> {
    BannerRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("banner {id}")))
}

#[instrument(skip(state, input))]
pub async fn create_banner(
    State(state): State<AppState>,
    Json(mut input): Json<BannerInput>,
) -> Result<(StatusCode, Json<Banner>)> {
    input.validate().map_err(AppError::BadRequest)?;
    let banner = BannerRepository::new(state.pool()).create(&input).await?;
    info!(banner_id = %banner.id, "Banner created");
    Ok((StatusCode::CREATED, Json(banner)))
}

#[instrument(skip(state, input), fields(banner_id = %id))]
pub async fn update_banner(
    State(state): State<AppState>,
    Path(id): Path<BannerId>,
    Json(mut input): Json<BannerInput>,
) -> Result<Json<Banner>> {
    input.validate().map_err(AppError::BadRequest)?;
    Ok(Json(
        BannerRepository::new(state.pool()).update(id, &input).await?,
    ))
}

#[instrument(skip(state), fields(banner_id = %id))]
pub async fn delete_banner(
    State(state): State<AppState>,
    Path(id): Path<BannerId>,
) -> Result<StatusCode> {
    BannerRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Feature icons
// =============================================================================

/// `GET /admin/api/feature-icons` - all icons, active or not.
#[instrument(skip(state))]
pub async fn list_feature_icons(State(state): State<AppState>) -> Result<Json<Vec<FeatureIcon>>> {
    Ok(Json(FeatureIconRepository::new(state.pool()).list(false).await?))
}

#[instrument(skip(state), fields(feature_icon_id = %id))]
pub async fn show_feature_icon(
    State(state): State<AppState>,
    Path(id): Path<FeatureIconId>,
) -> Result<Json<FeatureIcon>> {
    FeatureIconRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("feature icon {id}")))
}

#[instrument(skip(state, input))]
pub async fn create_feature_icon(
    State(state): State<AppState>,
    Json(mut input): Json<FeatureIconInput>,
) -> Result<(StatusCode, Json<FeatureIcon>)> {
    input.validate().map_err(AppError::BadRequest)?;
    let icon = FeatureIconRepository::new(state.pool()).create(&input).await?;
    info!(feature_icon_id = %icon.id, "Feature icon created");
    Ok((StatusCode::CREATED, Json(icon)))
}

#[instrument(skip(state, input), fields(feature_icon_id = %id))]
pub async fn update_feature_icon(
    State(state): State<AppState>,
    Path(id): Path<FeatureIconId>,
    Json(mut input): Json<FeatureIconInput>,
) -> Result<Json<FeatureIcon>> {
    input.validate().map_err(AppError::BadRequest)?;
    Ok(Json(
        FeatureIconRepository::new(state.pool())
            .update(id, &input)
            .await?,
    ))
}

#[instrument(skip(state), fields(feature_icon_id = %id))]
pub async fn delete_feature_icon(
    State(state): State<AppState>,
    Path(id): Path<FeatureIconId>,
) -> Result<StatusCode> {
    FeatureIconRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
