//! Database operations for the category tree.
//!
//! Ordering changes lock the affected sibling group, plan the new values with
//! [`shoply_core::catalog`], and write every assignment in one transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use shoply_core::CategoryId;
use shoply_core::catalog::{
    self, MOVE_STEP, ORDER_STEP, OrderAssignment, OrderingError, SiblingPosition,
};

use super::{RepositoryError, map_unique_violation};
use crate::models::{Category, CategoryInput};

const DUPLICATE_SLUG: &str = "a category with this slug already exists";

const CATEGORY_COLUMNS: &str = r#"id, name, slug, description, image_url, parent_id, "order", created_at, updated_at"#;

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i32,
    name: String,
    slug: String,
    description: Option<String>,
    image_url: Option<String>,
    parent_id: Option<i32>,
    order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            slug: row.slug,
            description: row.description,
            image_url: row.image_url,
            parent_id: row.parent_id.map(CategoryId::new),
            order: row.order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PositionRow {
    id: i32,
    order: i32,
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories, roots first, siblings by `order`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Category>, RepositoryError> {
        let sql = format!(
            r#"SELECT {CATEGORY_COLUMNS} FROM shop.category ORDER BY parent_id NULLS FIRST, "order", id"#
        );
        let rows = sqlx::query_as::<_, CategoryRow>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM shop.category WHERE id = $1");
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM shop.category WHERE slug = $1");
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Whether another category already uses `slug`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slug_exists(
        &self,
        slug: &str,
        except: Option<CategoryId>,
    ) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM shop.category WHERE slug = $1 AND ($2::int IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(except)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_children(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM shop.category WHERE parent_id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Create a category at the end of its sibling group.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the parent does not exist, or
    /// `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(
        &self,
        input: &CategoryInput,
        slug: &str,
    ) -> Result<Category, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if let Some(parent) = input.parent_id {
            ensure_exists(&mut tx, parent).await?;
        }
        let siblings = lock_siblings(&mut tx, input.parent_id).await?;
        let order = catalog::next_order(&siblings, MOVE_STEP);

        let sql = format!(
            r#"
            INSERT INTO shop.category (name, slug, description, image_url, parent_id, "order")
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CATEGORY_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(&input.name)
            .bind(slug)
            .bind(input.description.as_deref())
            .bind(input.image_url.as_deref())
            .bind(input.parent_id)
            .bind(order)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, DUPLICATE_SLUG))?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Replace a category's fields. A parent change moves it to the end of
    /// the new sibling group.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category or new parent does
    /// not exist, `RepositoryError::Ordering` if the new parent is a
    /// descendant, or `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        input: &CategoryInput,
        slug: &str,
    ) -> Result<Category, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (current_parent, current_order) = lock_category(&mut tx, id).await?;
        let order = if input.parent_id == current_parent {
            current_order
        } else {
            reparent_check(&mut tx, id, input.parent_id).await?;
            let siblings = lock_siblings(&mut tx, input.parent_id).await?;
            catalog::next_order(&siblings, MOVE_STEP)
        };

        let sql = format!(
            r#"
            UPDATE shop.category
            SET name = $2, slug = $3, description = $4, image_url = $5,
                parent_id = $6, "order" = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(id)
            .bind(&input.name)
            .bind(slug)
            .bind(input.description.as_deref())
            .bind(input.image_url.as_deref())
            .bind(input.parent_id)
            .bind(order)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, DUPLICATE_SLUG))?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Move a category to `new_order` among its siblings, optionally under a
    /// new parent first. Siblings between the old and new slot shift by one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category or parent does not
    /// exist, or `RepositoryError::Ordering` for a negative order or a
    /// descendant parent.
    pub async fn move_to(
        &self,
        id: CategoryId,
        new_parent: Option<Option<CategoryId>>,
        new_order: i32,
    ) -> Result<Vec<OrderAssignment>, RepositoryError> {
        if new_order < 0 {
            return Err(OrderingError::NegativeOrder.into());
        }

        let mut tx = self.pool.begin().await?;
        let (current_parent, _) = lock_category(&mut tx, id).await?;

        let parent = new_parent.unwrap_or(current_parent);
        if parent != current_parent {
            reparent_check(&mut tx, id, parent).await?;
            let siblings = lock_siblings(&mut tx, parent).await?;
            let append_at = catalog::next_order(&siblings, MOVE_STEP);
            sqlx::query(
                r#"UPDATE shop.category SET parent_id = $2, "order" = $3, updated_at = NOW() WHERE id = $1"#,
            )
            .bind(id)
            .bind(parent)
            .bind(append_at)
            .execute(&mut *tx)
            .await?;
        }

        let siblings = lock_siblings(&mut tx, parent).await?;
        let plan = catalog::plan_move(&siblings, id, new_order, MOVE_STEP)?;
        apply_assignments(&mut tx, &plan).await?;

        tx.commit().await?;
        Ok(plan)
    }

    /// Put a sibling group in the given order, spaced by [`ORDER_STEP`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Ordering` unless `ids` lists every sibling
    /// exactly once.
    pub async fn reorder(
        &self,
        parent: Option<CategoryId>,
        ids: &[CategoryId],
    ) -> Result<Vec<OrderAssignment>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let siblings = lock_siblings(&mut tx, parent).await?;
        let plan = catalog::plan_reorder(&siblings, ids, ORDER_STEP)?;
        apply_assignments(&mut tx, &plan).await?;

        tx.commit().await?;
        Ok(plan)
    }

    /// Renumber every sibling group to `0, 10, 20, ...`.
    ///
    /// Returns the number of rows changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn normalize_all(&self) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let parents: Vec<Option<i32>> =
            sqlx::query_scalar("SELECT DISTINCT parent_id FROM shop.category")
                .fetch_all(&mut *tx)
                .await?;

        let mut changed = 0;
        for parent in parents {
            let siblings = lock_siblings(&mut tx, parent.map(CategoryId::new)).await?;
            let plan = catalog::plan_normalize(&siblings, ORDER_STEP)?;
            apply_assignments(&mut tx, &plan).await?;
            changed += plan.len();
        }

        tx.commit().await?;
        Ok(changed)
    }

    /// Delete a category without children. Its products become uncategorized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist, or
    /// `RepositoryError::Conflict` if it still has children.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.category WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_foreign_key_violation()
                {
                    return RepositoryError::Conflict("category has subcategories".to_string());
                }
                RepositoryError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

async fn ensure_exists(
    tx: &mut Transaction<'_, Postgres>,
    id: CategoryId,
) -> Result<(), RepositoryError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM shop.category WHERE id = $1)")
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;
    if exists {
        Ok(())
    } else {
        Err(RepositoryError::NotFound)
    }
}

/// Lock a category row and return its parent and order.
async fn lock_category(
    tx: &mut Transaction<'_, Postgres>,
    id: CategoryId,
) -> Result<(Option<CategoryId>, i32), RepositoryError> {
    let row: Option<(Option<i32>, i32)> =
        sqlx::query_as(r#"SELECT parent_id, "order" FROM shop.category WHERE id = $1 FOR UPDATE"#)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
    let (parent, order) = row.ok_or(RepositoryError::NotFound)?;
    Ok((parent.map(CategoryId::new), order))
}

/// Lock and return the positions of one sibling group.
async fn lock_siblings(
    tx: &mut Transaction<'_, Postgres>,
    parent: Option<CategoryId>,
) -> Result<Vec<SiblingPosition>, RepositoryError> {
    let rows = sqlx::query_as::<_, PositionRow>(
        r#"
        SELECT id, "order" FROM shop.category
        WHERE parent_id IS NOT DISTINCT FROM $1
        ORDER BY "order", id
        FOR UPDATE
        "#,
    )
    .bind(parent)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| SiblingPosition {
            id: CategoryId::new(r.id),
            order: r.order,
        })
        .collect())
}

/// Reject a missing parent or one that is the category or its descendant.
async fn reparent_check(
    tx: &mut Transaction<'_, Postgres>,
    id: CategoryId,
    parent: Option<CategoryId>,
) -> Result<(), RepositoryError> {
    let Some(parent_id) = parent else {
        return Ok(());
    };
    if parent_id == id {
        return Err(OrderingError::CreatesCycle.into());
    }

    let rows: Vec<(i32, Option<i32>)> = sqlx::query_as("SELECT id, parent_id FROM shop.category")
        .fetch_all(&mut **tx)
        .await?;
    let parents: HashMap<CategoryId, Option<CategoryId>> = rows
        .into_iter()
        .map(|(id, parent)| (CategoryId::new(id), parent.map(CategoryId::new)))
        .collect();

    if !parents.contains_key(&parent_id) {
        return Err(RepositoryError::NotFound);
    }
    if catalog::creates_cycle(id, parent, |c| parents.get(&c).copied().flatten()) {
        return Err(OrderingError::CreatesCycle.into());
    }
    Ok(())
}

async fn apply_assignments(
    tx: &mut Transaction<'_, Postgres>,
    plan: &[OrderAssignment],
) -> Result<(), RepositoryError> {
    for assignment in plan {
        sqlx::query(r#"UPDATE shop.category SET "order" = $2, updated_at = NOW() WHERE id = $1"#)
            .bind(assignment.id)
            .bind(assignment.order)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}
