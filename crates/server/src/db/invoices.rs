//! Database operations for invoices.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use shoply_core::invoice::InvoiceTerms;
use shoply_core::{InvoiceId, OrderId};

use super::{RepositoryError, page_bounds};
use crate::models::{Invoice, Page, Pagination};

const INVOICE_COLUMNS: &str = "id, order_id, invoice_number, issue_date, due_date, total, \
    vat_base, vat_amount, vat_rate, pdf_url, created_at";

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: i32,
    order_id: i32,
    invoice_number: String,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    total: Decimal,
    vat_base: Decimal,
    vat_amount: Decimal,
    vat_rate: Decimal,
    pdf_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<InvoiceRow> for Invoice {
    fn from(row: InvoiceRow) -> Self {
        Self {
            id: InvoiceId::new(row.id),
            order_id: OrderId::new(row.order_id),
            invoice_number: row.invoice_number,
            issue_date: row.issue_date,
            due_date: row.due_date,
            total: row.total,
            vat_base: row.vat_base,
            vat_amount: row.vat_amount,
            vat_rate: row.vat_rate,
            pdf_url: row.pdf_url,
            created_at: row.created_at,
        }
    }
}

/// Repository for invoice database operations.
pub struct InvoiceRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InvoiceRepository<'a> {
    /// Create a new invoice repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Newest invoices first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, pagination: Pagination) -> Result<Page<Invoice>, RepositoryError> {
        let (limit, offset) = page_bounds(pagination.page, pagination.per_page);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop.invoice")
            .fetch_one(self.pool)
            .await?;

        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM shop.invoice ORDER BY issue_date DESC, id DESC LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;

        Ok(Page {
            items: rows.into_iter().map(Into::into).collect(),
            total,
            page: pagination.page.max(1),
            per_page: pagination.per_page.clamp(1, 100),
        })
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM shop.invoice WHERE id = $1");
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Invoice>, RepositoryError> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM shop.invoice WHERE order_id = $1");
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(order_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Insert the invoice for an order, or return the one that already exists.
    ///
    /// The boolean is `true` when a new row was written.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn create_or_get(
        &self,
        order_id: OrderId,
        terms: &InvoiceTerms,
    ) -> Result<(Invoice, bool), RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO shop.invoice
                (order_id, invoice_number, issue_date, due_date, total, vat_base,
                 vat_amount, vat_rate)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (order_id) DO NOTHING
            RETURNING {INVOICE_COLUMNS}
            "
        );
        let inserted = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(order_id)
            .bind(&terms.invoice_number)
            .bind(terms.issue_date)
            .bind(terms.due_date)
            .bind(terms.vat.total)
            .bind(terms.vat.base)
            .bind(terms.vat.vat)
            .bind(terms.vat.rate)
            .fetch_optional(self.pool)
            .await?;

        if let Some(row) = inserted {
            return Ok((row.into(), true));
        }

        let existing = self
            .get_by_order(order_id)
            .await?
            .ok_or_else(|| RepositoryError::DataCorruption(format!("invoice for order {order_id} vanished")))?;
        Ok((existing, false))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the invoice does not exist.
    pub async fn set_pdf_url(&self, id: InvoiceId, url: &str) -> Result<Invoice, RepositoryError> {
        let sql = format!(
            "UPDATE shop.invoice SET pdf_url = $2 WHERE id = $1 RETURNING {INVOICE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(id)
            .bind(url)
            .fetch_optional(self.pool)
            .await?;
        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the invoice does not exist.
    pub async fn delete(&self, id: InvoiceId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.invoice WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
