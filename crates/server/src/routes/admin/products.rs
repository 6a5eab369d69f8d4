//! Admin product management.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use shoply_core::{ProductId, Slug};
use tracing::{info, instrument};

use crate::db::ProductRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::{Page, Product, ProductFilter, ProductInput, ProductPatch};
use crate::state::AppState;

/// Resolve the slug for a write and check that no other product uses it.
async fn unique_slug(
    repo: &ProductRepository<'_>,
    input: &ProductInput,
    except: Option<ProductId>,
) -> Result<Slug> {
    let slug = Slug::explicit_or_from_name(input.slug.as_deref(), &input.name)?;
    if repo.slug_exists(slug.as_str(), except).await? {
        return Err(AppError::BadRequest(format!(
            "a product with slug '{slug}' already exists"
        )));
    }
    Ok(slug)
}

/// `GET /admin/api/products` - includes inactive products.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(mut filter): Query<ProductFilter>,
) -> Result<Json<Page<Product>>> {
    filter.include_inactive = true;
    Ok(Json(ProductRepository::new(state.pool()).list(&filter).await?))
}

/// `GET /admin/api/products/{id}`
#[instrument(skip(state), fields(product_id = %id))]
pub async fn show(State(state): State<AppState>, Path(id): Path<ProductId>) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// `POST /admin/api/products`
#[instrument(skip(state, input), fields(name = %input.name))]
pub async fn create(
    State(state): State<AppState>,
    Json(mut input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    input.validate().map_err(AppError::BadRequest)?;

    let repo = ProductRepository::new(state.pool());
    let slug = unique_slug(&repo, &input, None).await?;
    let product = repo.create(&input, slug.as_str()).await?;

    add_breadcrumb("admin", "Product created", Some(&[("slug", slug.as_str())]));
    info!(product_id = %product.id, slug = %product.slug, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /admin/api/products/{id}` - replace the product; variants are synced
/// when `variants` is present.
#[instrument(skip(state, input), fields(product_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(mut input): Json<ProductInput>,
) -> Result<Json<Product>> {
    input.validate().map_err(AppError::BadRequest)?;

    let repo = ProductRepository::new(state.pool());
    let slug = unique_slug(&repo, &input, Some(id)).await?;
    let product = repo.update(id, &input, slug.as_str()).await?;

    info!(product_id = %id, "Product updated");
    Ok(Json(product))
}

/// `PATCH /admin/api/products/{id}`
#[instrument(skip(state, patch), fields(product_id = %id))]
pub async fn patch(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(mut patch): Json<ProductPatch>,
) -> Result<Json<Product>> {
    patch.validate().map_err(AppError::BadRequest)?;
    let product = ProductRepository::new(state.pool()).patch(id, &patch).await?;
    Ok(Json(product))
}

/// `DELETE /admin/api/products/{id}`
#[instrument(skip(state), fields(product_id = %id))]
pub async fn delete(State(state): State<AppState>, Path(id): Path<ProductId>) -> Result<StatusCode> {
    ProductRepository::new(state.pool()).delete(id).await?;
    info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
