//! Database operations for orders and their history.
//!
//! Placing an order locks every referenced product and variant row, prices
//! the lines from the database, decrements stock with guarded updates, and
//! writes the order plus its `created` history entry in one transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use thiserror::Error;

use shoply_core::cart::ShippingPolicy;
use shoply_core::order_flow::{
    self, HistoryEntry, OrderChangePlan, OrderFlowError, OrderPatch, OrderSnapshot,
};
use shoply_core::{
    CurrencyCode, OrderHistoryId, OrderId, ProductId, VariantId, round_money,
};

use super::{RepositoryError, page_bounds, parse_column};
use crate::models::order::{CustomerDetails, DeliveryAddress, OrderFilter};
use crate::models::product::effective_price;
use crate::models::{
    CheckoutDetails, DEFAULT_PER_PAGE, Order, OrderHistoryEntry, OrderItem, OrderItemRequest, Page,
};

const ORDER_COLUMNS: &str = "id, order_number, first_name, last_name, email, phone, street, \
    city, zip, country, company, company_id, vat_id, delivery_name, delivery_street, \
    delivery_city, delivery_zip, delivery_country, delivery_method, payment_method, items, \
    subtotal, shipping_price, total, currency, status, payment_status, tracking_number, note, \
    created_at, updated_at";

/// Errors from placing or updating an order.
#[derive(Debug, Error)]
pub enum OrderWriteError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Product is missing or inactive.
    #[error("product {0} is not available")]
    Unavailable(ProductId),

    #[error("variant {variant} does not belong to product {product}")]
    UnknownVariant {
        product: ProductId,
        variant: VariantId,
    },

    #[error("not enough stock for {name}: {available} available")]
    InsufficientStock { name: String, available: i32 },

    #[error(transparent)]
    Flow(#[from] OrderFlowError),
}

impl From<sqlx::Error> for OrderWriteError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    order_number: i64,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    street: String,
    city: String,
    zip: String,
    country: String,
    company: Option<String>,
    company_id: Option<String>,
    vat_id: Option<String>,
    delivery_name: Option<String>,
    delivery_street: Option<String>,
    delivery_city: Option<String>,
    delivery_zip: Option<String>,
    delivery_country: Option<String>,
    delivery_method: String,
    payment_method: String,
    items: Json<Vec<OrderItem>>,
    subtotal: Decimal,
    shipping_price: Decimal,
    total: Decimal,
    currency: String,
    status: String,
    payment_status: String,
    tracking_number: Option<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId::new(row.id),
            order_number: row.order_number,
            customer: CustomerDetails {
                first_name: row.first_name,
                last_name: row.last_name,
                email: row.email,
                phone: row.phone,
                street: row.street,
                city: row.city,
                zip: row.zip,
                country: row.country,
                company: row.company,
                company_id: row.company_id,
                vat_id: row.vat_id,
            },
            delivery: DeliveryAddress {
                delivery_name: row.delivery_name,
                delivery_street: row.delivery_street,
                delivery_city: row.delivery_city,
                delivery_zip: row.delivery_zip,
                delivery_country: row.delivery_country,
            },
            delivery_method: parse_column(&row.delivery_method, "delivery_method")?,
            payment_method: parse_column(&row.payment_method, "payment_method")?,
            items: row.items.0,
            subtotal: row.subtotal,
            shipping_price: row.shipping_price,
            total: row.total,
            currency: parse_column(&row.currency, "currency")?,
            status: parse_column(&row.status, "status")?,
            payment_status: parse_column(&row.payment_status, "payment_status")?,
            tracking_number: row.tracking_number,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    id: i32,
    order_id: i32,
    field: Option<String>,
    old_value: Option<String>,
    new_value: Option<String>,
    message: String,
    created_at: DateTime<Utc>,
}

impl From<HistoryRow> for OrderHistoryEntry {
    fn from(row: HistoryRow) -> Self {
        Self {
            id: OrderHistoryId::new(row.id),
            order_id: OrderId::new(row.order_id),
            field: row.field,
            old_value: row.old_value,
            new_value: row.new_value,
            message: row.message,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LockedProduct {
    name: String,
    price: Decimal,
    sale_price: Option<Decimal>,
    stock: i32,
    is_active: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct LockedVariant {
    name: String,
    sku: Option<String>,
    stock: i32,
    price: Option<Decimal>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order for already-merged `items`.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable`, `UnknownVariant` or `InsufficientStock` when a
    /// line cannot be fulfilled; nothing is written in that case.
    pub async fn place(
        &self,
        details: &CheckoutDetails,
        items: &[OrderItemRequest],
        shipping: &ShippingPolicy,
        currency: CurrencyCode,
    ) -> Result<Order, OrderWriteError> {
        // Lock in id order.
        let mut sorted = items.to_vec();
        sorted.sort_by_key(|i| (i.product_id, i.variant_id));

        let mut tx = self.pool.begin().await?;
        let mut lines = Vec::with_capacity(sorted.len());

        for item in &sorted {
            let quantity = i32::try_from(item.quantity).map_err(|_| {
                RepositoryError::Conflict("quantity out of range".to_string())
            })?;

            let product = sqlx::query_as::<_, LockedProduct>(
                "SELECT name, price, sale_price, stock, is_active FROM shop.product WHERE id = $1 FOR UPDATE",
            )
            .bind(item.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .filter(|p| p.is_active)
            .ok_or(OrderWriteError::Unavailable(item.product_id))?;

            let line = if let Some(variant_id) = item.variant_id {
                let variant = sqlx::query_as::<_, LockedVariant>(
                    r"
                    SELECT name, sku, stock, price FROM shop.product_variant
                    WHERE id = $1 AND product_id = $2
                    FOR UPDATE
                    ",
                )
                .bind(variant_id)
                .bind(item.product_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(OrderWriteError::UnknownVariant {
                    product: item.product_id,
                    variant: variant_id,
                })?;

                let updated = sqlx::query(
                    "UPDATE shop.product_variant SET stock = stock - $2 WHERE id = $1 AND stock >= $2",
                )
                .bind(variant_id)
                .bind(quantity)
                .execute(&mut *tx)
                .await?;
                if updated.rows_affected() == 0 {
                    return Err(OrderWriteError::InsufficientStock {
                        name: format!("{} ({})", product.name, variant.name),
                        available: variant.stock,
                    });
                }

                let unit_price = variant
                    .price
                    .unwrap_or_else(|| effective_price(product.price, product.sale_price));
                order_item(item, product.name, Some(variant.name), variant.sku, unit_price, quantity)
            } else {
                let updated = sqlx::query(
                    "UPDATE shop.product SET stock = stock - $2, updated_at = NOW() WHERE id = $1 AND stock >= $2",
                )
                .bind(item.product_id)
                .bind(quantity)
                .execute(&mut *tx)
                .await?;
                if updated.rows_affected() == 0 {
                    return Err(OrderWriteError::InsufficientStock {
                        name: product.name,
                        available: product.stock,
                    });
                }

                let unit_price = effective_price(product.price, product.sale_price);
                order_item(item, product.name, None, None, unit_price, quantity)
            };
            lines.push(line);
        }

        let subtotal = round_money(lines.iter().map(|l| l.total).sum());
        let shipping_price = shipping.shipping_for(subtotal, details.delivery_method);
        let total = subtotal + shipping_price;

        let customer = &details.customer;
        let delivery = &details.delivery;
        let sql = format!(
            r#"
            INSERT INTO shop."order"
                (first_name, last_name, email, phone, street, city, zip, country,
                 company, company_id, vat_id, delivery_name, delivery_street,
                 delivery_city, delivery_zip, delivery_country, delivery_method,
                 payment_method, items, subtotal, shipping_price, total, currency, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23, $24)
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(&customer.first_name)
            .bind(&customer.last_name)
            .bind(&customer.email)
            .bind(&customer.phone)
            .bind(&customer.street)
            .bind(&customer.city)
            .bind(&customer.zip)
            .bind(&customer.country)
            .bind(customer.company.as_deref())
            .bind(customer.company_id.as_deref())
            .bind(customer.vat_id.as_deref())
            .bind(delivery.delivery_name.as_deref())
            .bind(delivery.delivery_street.as_deref())
            .bind(delivery.delivery_city.as_deref())
            .bind(delivery.delivery_zip.as_deref())
            .bind(delivery.delivery_country.as_deref())
            .bind(details.delivery_method.as_str())
            .bind(details.payment_method.as_str())
            .bind(Json(&lines))
            .bind(subtotal)
            .bind(shipping_price)
            .bind(total)
            .bind(currency.code())
            .bind(details.note.as_deref())
            .fetch_one(&mut *tx)
            .await?;

        let order = Order::try_from(row)?;
        insert_history(
            &mut *tx,
            order.id,
            &order_flow::created_entry(order.order_number),
        )
        .await?;

        tx.commit().await?;
        Ok(order)
    }

    /// List orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &OrderFilter) -> Result<Page<Order>, RepositoryError> {
        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, 100);
        let (limit, offset) = page_bounds(page, per_page);
        let status = filter.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM shop."order" WHERE ($1::text IS NULL OR status = $1)"#,
        )
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM shop."order"
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(Order::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            items,
            total,
            page,
            per_page,
        })
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!(r#"SELECT {ORDER_COLUMNS} FROM shop."order" WHERE id = $1"#);
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        row.map(Order::try_from).transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_number(&self, order_number: i64) -> Result<Option<Order>, RepositoryError> {
        let sql = format!(r#"SELECT {ORDER_COLUMNS} FROM shop."order" WHERE order_number = $1"#);
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_number)
            .fetch_optional(self.pool)
            .await?;
        row.map(Order::try_from).transpose()
    }

    /// History entries of an order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn history(&self, id: OrderId) -> Result<Vec<OrderHistoryEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r"
            SELECT id, order_id, field, old_value, new_value, message, created_at
            FROM shop.order_history
            WHERE order_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Apply an admin update: plan against the locked row, then write the
    /// new values and history entries together.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist, or
    /// `OrderWriteError::Flow` for a disallowed status transition.
    pub async fn update(
        &self,
        id: OrderId,
        patch: &OrderPatch,
    ) -> Result<(Order, OrderChangePlan), OrderWriteError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(r#"SELECT {ORDER_COLUMNS} FROM shop."order" WHERE id = $1 FOR UPDATE"#);
        let current = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let current = Order::try_from(current)?;

        let snapshot = OrderSnapshot {
            status: current.status,
            payment_status: current.payment_status,
            tracking_number: current.tracking_number.clone(),
            note: current.note.clone(),
        };
        let plan = order_flow::plan_order_update(&snapshot, patch)?;
        if plan.is_noop() {
            return Ok((current, plan));
        }

        let sql = format!(
            r#"
            UPDATE shop."order"
            SET status = $2, payment_status = $3, tracking_number = $4, note = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(plan.next.status.as_str())
            .bind(plan.next.payment_status.as_str())
            .bind(plan.next.tracking_number.as_deref())
            .bind(plan.next.note.as_deref())
            .fetch_one(&mut *tx)
            .await?;

        for entry in &plan.history {
            insert_history(&mut *tx, id, entry).await?;
        }

        tx.commit().await?;
        Ok((Order::try_from(row)?, plan))
    }

    /// Append one history entry outside an update (e.g. after an email).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn append_history(
        &self,
        id: OrderId,
        entry: &HistoryEntry,
    ) -> Result<(), RepositoryError> {
        insert_history(self.pool, id, entry).await
    }

    /// Delete an order with its history and invoice.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query(r#"DELETE FROM shop."order" WHERE id = $1"#)
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

fn order_item(
    item: &OrderItemRequest,
    name: String,
    variant_name: Option<String>,
    sku: Option<String>,
    unit_price: Decimal,
    quantity: i32,
) -> OrderItem {
    OrderItem {
        product_id: item.product_id,
        variant_id: item.variant_id,
        name,
        variant_name,
        sku,
        unit_price,
        quantity,
        total: round_money(unit_price * Decimal::from(quantity)),
    }
}

async fn insert_history<'e, E>(
    executor: E,
    order_id: OrderId,
    entry: &HistoryEntry,
) -> Result<(), RepositoryError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r"
        INSERT INTO shop.order_history (order_id, field, old_value, new_value, message)
        VALUES ($1, $2, $3, $4, $5)
        ",
    )
    .bind(order_id)
    .bind(entry.field)
    .bind(entry.old_value.as_deref())
    .bind(entry.new_value.as_deref())
    .bind(&entry.message)
    .execute(executor)
    .await?;
    Ok(())
}
