//! Database operations for the shop `PostgreSQL` schema.
//!
//! # Schema: `shop`
//!
//! ## Tables
//!
//! - `category` - Category tree (`parent_id`, sibling `order`)
//! - `product`, `product_variant` - Catalog
//! - `order`, `order_history` - Orders and their append-only audit log
//! - `invoice` - One invoice per order
//! - `banner`, `feature_icon` - Promotional content
//! - `session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p shoply-cli -- migrate
//! ```

pub mod banners;
pub mod categories;
pub mod feature_icons;
pub mod invoices;
pub mod orders;
pub mod products;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use banners::BannerRepository;
pub use categories::CategoryRepository;
pub use feature_icons::FeatureIconRepository;
pub use invoices::InvoiceRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate slug).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A category ordering change was rejected.
    #[error(transparent)]
    Ordering(#[from] shoply_core::catalog::OrderingError),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-constraint violation to `Conflict` with a readable message.
pub(crate) fn map_unique_violation(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_string());
    }
    RepositoryError::Database(e)
}

/// Parse a `TEXT` status column, flagging unknown values as corruption.
pub(crate) fn parse_column<T>(value: &str, column: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr,
{
    value
        .parse()
        .map_err(|_| RepositoryError::DataCorruption(format!("invalid {column}: {value}")))
}

/// `LIMIT`/`OFFSET` for a 1-based page.
#[must_use]
pub fn page_bounds(page: u32, per_page: u32) -> (i64, i64) {
    let per_page = per_page.clamp(1, 100);
    let page = page.max(1);
    (
        i64::from(per_page),
        i64::from(page - 1) * i64::from(per_page),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        assert_eq!(page_bounds(1, 20), (20, 0));
        assert_eq!(page_bounds(3, 20), (20, 40));
        assert_eq!(page_bounds(0, 0), (1, 0));
        assert_eq!(page_bounds(2, 1000), (100, 100));
    }

    #[test]
    fn test_parse_column_flags_corruption() {
        let ok: Result<shoply_core::OrderStatus, _> = parse_column("shipped", "status");
        assert!(ok.is_ok());

        let bad: Result<shoply_core::OrderStatus, _> = parse_column("lost", "status");
        assert!(matches!(bad, Err(RepositoryError::DataCorruption(_))));
    }
}
