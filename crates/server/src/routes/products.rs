//! Storefront product routes.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::models::{Page, Product, ProductFilter};
use crate::state::AppState;

/// `GET /api/products` - active products, filtered and paginated.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(mut filter): Query<ProductFilter>,
) -> Result<Json<Page<Product>>> {
    filter.include_inactive = false;
    let page = ProductRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(page))
}

/// `GET /api/products/{slug}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .get_active_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product '{slug}'")))
}
