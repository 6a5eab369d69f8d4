//! Session middleware configuration.
//!
//! Sessions hold the visitor's cart and the admin flag. They live in the
//! `shop.session` table created by the schema migration.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::ShopConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "shoply_session";

/// Sessions expire after 14 days without activity.
const SESSION_EXPIRY_SECONDS: i64 = 14 * 24 * 60 * 60;

const SESSION_SCHEMA: &str = "shop";
const SESSION_TABLE: &str = "session";

/// Error configuring the session store.
#[derive(Debug, thiserror::Error)]
#[error("invalid session store configuration: {0}")]
pub struct SessionConfigError(String);

/// Create the session layer backed by `shop.session`.
///
/// # Errors
///
/// Returns `SessionConfigError` if the schema or table name is rejected by
/// the store.
pub fn create_session_layer(
    pool: &PgPool,
    config: &ShopConfig,
) -> Result<SessionManagerLayer<PostgresStore>, SessionConfigError> {
    let store = PostgresStore::new(pool.clone())
        .with_schema_name(SESSION_SCHEMA)
        .map_err(SessionConfigError)?
        .with_table_name(SESSION_TABLE)
        .map_err(SessionConfigError)?;

    let is_secure = config.base_url.starts_with("https://");

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/"))
}
