//! Storefront category routes, served from the cached category list.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::models::{CategoryDetail, CategoryNode};
use crate::services::category_tree;
use crate::state::AppState;

/// `GET /api/categories` - the full tree, siblings in display order.
#[instrument(skip(state))]
pub async fn tree(State(state): State<AppState>) -> Result<Json<Vec<CategoryNode>>> {
    let categories = state.categories().categories(state.pool()).await?;
    Ok(Json(category_tree::build_tree(&categories)))
}

/// `GET /api/categories/{slug}` - category with breadcrumbs and children.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<CategoryDetail>> {
    let categories = state.categories().categories(state.pool()).await?;
    category_tree::detail(&categories, &slug)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("category '{slug}'")))
}
