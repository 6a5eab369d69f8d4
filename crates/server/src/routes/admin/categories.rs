//! Admin category management.
//!
//! Every write drops the cached storefront tree.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use shoply_core::catalog::OrderAssignment;
use shoply_core::{CategoryId, Slug};
use tracing::{info, instrument};

use crate::db::CategoryRepository;
use crate::error::{AppError, Result};
use crate::models::category::{MoveCategory, ReorderCategories};
use crate::models::{Category, CategoryInput};
use crate::state::AppState;

async fn unique_slug(
    repo: &CategoryRepository<'_>,
    input: &CategoryInput,
    except: Option<CategoryId>,
) -> Result<Slug> {
    let slug = Slug::explicit_or_from_name(input.slug.as_deref(), &input.name)?;
    if repo.slug_exists(slug.as_str(), except).await? {
        return Err(AppError::BadRequest(format!(
            "a category with slug '{slug}' already exists"
        )));
    }
    Ok(slug)
}

/// `GET /admin/api/categories` - flat list ordered by parent and `order`.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(CategoryRepository::new(state.pool()).list_all().await?))
}

/// `GET /admin/api/categories/{id}`
#[instrument(skip(state), fields(category_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>> {
    CategoryRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("category {id}")))
}

/// `POST /admin/api/categories` - appended to the end of its sibling group.
#[instrument(skip(state, input), fields(name = %input.name))]
pub async fn create(
    State(state): State<AppState>,
    Json(mut input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    input.validate().map_err(AppError::BadRequest)?;

    let repo = CategoryRepository::new(state.pool());
    let slug = unique_slug(&repo, &input, None).await?;
    let category = repo.create(&input, slug.as_str()).await?;
    state.categories().invalidate().await;

    info!(category_id = %category.id, slug = %category.slug, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// `PUT /admin/api/categories/{id}`
#[instrument(skip(state, input), fields(category_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(mut input): Json<CategoryInput>,
) -> Result<Json<Category>> {
    input.validate().map_err(AppError::BadRequest)?;

    let repo = CategoryRepository::new(state.pool());
    let slug = unique_slug(&repo, &input, Some(id)).await?;
    let category = repo.update(id, &input, slug.as_str()).await?;
    state.categories().invalidate().await;

    Ok(Json(category))
}

/// `DELETE /admin/api/categories/{id}` - refused while it has children.
#[instrument(skip(state), fields(category_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    let repo = CategoryRepository::new(state.pool());
    if repo.has_children(id).await? {
        return Err(AppError::Conflict(
            "category has subcategories; move or delete them first".to_string(),
        ));
    }
    repo.delete(id).await?;
    state.categories().invalidate().await;

    info!(category_id = %id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `PATCH /admin/api/categories/{id}/move` - returns the rows whose order
/// changed.
#[instrument(skip(state, request), fields(category_id = %id, order = request.order))]
pub async fn move_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(request): Json<MoveCategory>,
) -> Result<Json<Vec<OrderAssignment>>> {
    let changed = CategoryRepository::new(state.pool())
        .move_to(id, request.parent_id, request.order)
        .await?;
    state.categories().invalidate().await;

    info!(category_id = %id, changed = changed.len(), "Category moved");
    Ok(Json(changed))
}

/// `PATCH /admin/api/categories/reorder`
#[instrument(skip(state, request), fields(count = request.ids.len()))]
pub async fn reorder(
    State(state): State<AppState>,
    Json(request): Json<ReorderCategories>,
) -> Result<Json<Vec<OrderAssignment>>> {
    let changed = CategoryRepository::new(state.pool())
        .reorder(request.parent_id, &request.ids)
        .await?;
    state.categories().invalidate().await;

    Ok(Json(changed))
}
