//! Database operations for products and their variants.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use shoply_core::{CategoryId, ProductId, VariantId};

use super::{RepositoryError, map_unique_violation, page_bounds};
use crate::models::product::VariantInput;
use crate::models::{
    DEFAULT_PER_PAGE, Page, Product, ProductFilter, ProductInput, ProductPatch, ProductVariant,
};

const DUPLICATE_SLUG: &str = "a product with this slug already exists";
const DUPLICATE_SKU: &str = "a variant with this SKU already exists";

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.slug, p.description, p.price, p.sale_price, \
    p.stock, p.category_id, p.images, p.is_active, p.is_featured, p.created_at, p.updated_at";

/// Shared filter for listing and counting. `$1` category slug, `$2` search,
/// `$3` featured, `$4` include inactive.
const LIST_FILTER: &str = r"
    WITH RECURSIVE scope AS (
        SELECT id FROM shop.category WHERE slug = $1
        UNION
        SELECT c.id FROM shop.category c JOIN scope s ON c.parent_id = s.id
    )
    FROM_CLAUSE
    WHERE ($1::text IS NULL OR p.category_id IN (SELECT id FROM scope))
      AND ($2::text IS NULL
           OR strpos(lower(p.name), lower($2)) > 0
           OR strpos(lower(p.description), lower($2)) > 0)
      AND ($3::bool IS NULL OR p.is_featured = $3)
      AND ($4 OR p.is_active)
";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    slug: String,
    description: String,
    price: Decimal,
    sale_price: Option<Decimal>,
    stock: i32,
    category_id: Option<i32>,
    images: Json<Vec<String>>,
    is_active: bool,
    is_featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self, variants: Vec<ProductVariant>) -> Product {
        Product {
            id: ProductId::new(self.id),
            name: self.name,
            slug: self.slug,
            description: self.description,
            price: self.price,
            sale_price: self.sale_price,
            stock: self.stock,
            category_id: self.category_id.map(CategoryId::new),
            images: self.images.0,
            is_active: self.is_active,
            is_featured: self.is_featured,
            variants,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    id: i32,
    product_id: i32,
    name: String,
    color: Option<String>,
    size: Option<String>,
    sku: Option<String>,
    stock: i32,
    price: Option<Decimal>,
    position: i32,
}

impl From<VariantRow> for ProductVariant {
    fn from(row: VariantRow) -> Self {
        Self {
            id: VariantId::new(row.id),
            product_id: ProductId::new(row.product_id),
            name: row.name,
            color: row.color,
            size: row.size,
            sku: row.sku,
            stock: row.stock,
            price: row.price,
            position: row.position,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching a filter, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Page<Product>, RepositoryError> {
        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, 100);
        let (limit, offset) = page_bounds(page, per_page);

        let category = filter.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
        let search = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let count_sql = LIST_FILTER.replace("FROM_CLAUSE", "SELECT COUNT(*) FROM shop.product p");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(category)
            .bind(search)
            .bind(filter.featured)
            .bind(filter.include_inactive)
            .fetch_one(self.pool)
            .await?;

        let list_sql = format!(
            "{} ORDER BY {} LIMIT $5 OFFSET $6",
            LIST_FILTER.replace(
                "FROM_CLAUSE",
                &format!("SELECT {PRODUCT_COLUMNS} FROM shop.product p")
            ),
            filter.sort.order_by()
        );
        let rows = sqlx::query_as::<_, ProductRow>(&list_sql)
            .bind(category)
            .bind(search)
            .bind(filter.featured)
            .bind(filter.include_inactive)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;

        let items = self.attach_variants(rows).await?;
        Ok(Page {
            items,
            total,
            page,
            per_page,
        })
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM shop.product p WHERE p.id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        self.attach_one(row).await
    }

    /// Get an active product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product p WHERE p.slug = $1 AND p.is_active"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;
        self.attach_one(row).await
    }

    /// Whether another product already uses `slug`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slug_exists(
        &self,
        slug: &str,
        except: Option<ProductId>,
    ) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM shop.product WHERE slug = $1 AND ($2::int IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(except)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Create a product and its variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug or a variant SKU is taken.
    pub async fn create(
        &self,
        input: &ProductInput,
        slug: &str,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r"
            INSERT INTO shop.product AS p
                (name, slug, description, price, sale_price, stock, category_id,
                 images, is_active, is_featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PRODUCT_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&input.name)
            .bind(slug)
            .bind(&input.description)
            .bind(input.price)
            .bind(input.sale_price)
            .bind(input.stock)
            .bind(input.category_id)
            .bind(Json(&input.images))
            .bind(input.is_active)
            .bind(input.is_featured)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, DUPLICATE_SLUG))?;

        let product_id = ProductId::new(row.id);
        if let Some(variants) = &input.variants {
            sync_variants(&mut tx, product_id, variants).await?;
        }
        let variants = load_variants(&mut tx, product_id).await?;

        tx.commit().await?;
        Ok(row.into_product(variants))
    }

    /// Replace a product. Variants are synchronized when `input.variants` is set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist, or
    /// `RepositoryError::Conflict` if the slug or a variant SKU is taken.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
        slug: &str,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r"
            UPDATE shop.product AS p
            SET name = $2, slug = $3, description = $4, price = $5, sale_price = $6,
                stock = $7, category_id = $8, images = $9, is_active = $10,
                is_featured = $11, updated_at = NOW()
            WHERE p.id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(&input.name)
            .bind(slug)
            .bind(&input.description)
            .bind(input.price)
            .bind(input.sale_price)
            .bind(input.stock)
            .bind(input.category_id)
            .bind(Json(&input.images))
            .bind(input.is_active)
            .bind(input.is_featured)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, DUPLICATE_SLUG))?
            .ok_or(RepositoryError::NotFound)?;

        if let Some(variants) = &input.variants {
            sync_variants(&mut tx, id, variants).await?;
        }
        let variants = load_variants(&mut tx, id).await?;

        tx.commit().await?;
        Ok(row.into_product(variants))
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn patch(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, RepositoryError> {
        let sql = format!(
            r"
            UPDATE shop.product AS p
            SET name = COALESCE($2, name),
                price = COALESCE($3, price),
                sale_price = CASE WHEN $4 THEN $5 ELSE sale_price END,
                stock = COALESCE($6, stock),
                category_id = CASE WHEN $7 THEN $8 ELSE category_id END,
                is_active = COALESCE($9, is_active),
                is_featured = COALESCE($10, is_featured),
                updated_at = NOW()
            WHERE p.id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(patch.name.as_deref())
            .bind(patch.price)
            .bind(patch.sale_price.is_some())
            .bind(patch.sale_price.flatten())
            .bind(patch.stock)
            .bind(patch.category_id.is_some())
            .bind(patch.category_id.flatten())
            .bind(patch.is_active)
            .bind(patch.is_featured)
            .fetch_optional(self.pool)
            .await?;

        self.attach_one(row).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a product and its variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn attach_one(&self, row: Option<ProductRow>) -> Result<Option<Product>, RepositoryError> {
        match row {
            Some(row) => Ok(self.attach_variants(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Load variants for a batch of products with one query.
    async fn attach_variants(&self, rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let variant_rows = sqlx::query_as::<_, VariantRow>(
            r"
            SELECT id, product_id, name, color, size, sku, stock, price, position
            FROM shop.product_variant
            WHERE product_id = ANY($1)
            ORDER BY product_id, position, id
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_product: HashMap<i32, Vec<ProductVariant>> = HashMap::new();
        for variant in variant_rows {
            by_product
                .entry(variant.product_id)
                .or_default()
                .push(variant.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let variants = by_product.remove(&row.id).unwrap_or_default();
                row.into_product(variants)
            })
            .collect())
    }
}

async fn load_variants(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
) -> Result<Vec<ProductVariant>, RepositoryError> {
    let rows = sqlx::query_as::<_, VariantRow>(
        r"
        SELECT id, product_id, name, color, size, sku, stock, price, position
        FROM shop.product_variant
        WHERE product_id = $1
        ORDER BY position, id
        ",
    )
    .bind(product_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Make the stored variants match `variants`: entries with an id are updated,
/// the rest inserted, and variants missing from the list deleted. Positions
/// follow list order.
async fn sync_variants(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    variants: &[VariantInput],
) -> Result<(), RepositoryError> {
    let keep: Vec<i32> = variants
        .iter()
        .filter_map(|v| v.id.map(|id| id.as_i32()))
        .collect();

    sqlx::query("DELETE FROM shop.product_variant WHERE product_id = $1 AND id <> ALL($2)")
        .bind(product_id)
        .bind(&keep)
        .execute(&mut **tx)
        .await?;

    for (position, variant) in (0_i32..).zip(variants) {
        match variant.id {
            Some(variant_id) => {
                let result = sqlx::query(
                    r"
                    UPDATE shop.product_variant
                    SET name = $3, color = $4, size = $5, sku = $6, stock = $7,
                        price = $8, position = $9
                    WHERE id = $1 AND product_id = $2
                    ",
                )
                .bind(variant_id)
                .bind(product_id)
                .bind(&variant.name)
                .bind(variant.color.as_deref())
                .bind(variant.size.as_deref())
                .bind(variant.sku.as_deref())
                .bind(variant.stock)
                .bind(variant.price)
                .bind(position)
                .execute(&mut **tx)
                .await
                .map_err(|e| map_unique_violation(e, DUPLICATE_SKU))?;

                if result.rows_affected() == 0 {
                    return Err(RepositoryError::Conflict(format!(
                        "variant {variant_id} does not belong to this product"
                    )));
                }
            }
            None => {
                sqlx::query(
                    r"
                    INSERT INTO shop.product_variant
                        (product_id, name, color, size, sku, stock, price, position)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    ",
                )
                .bind(product_id)
                .bind(&variant.name)
                .bind(variant.color.as_deref())
                .bind(variant.size.as_deref())
                .bind(variant.sku.as_deref())
                .bind(variant.stock)
                .bind(variant.price)
                .bind(position)
                .execute(&mut **tx)
                .await
                .map_err(|e| map_unique_violation(e, DUPLICATE_SKU))?;
            }
        }
    }

    Ok(())
}
