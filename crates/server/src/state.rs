//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use url::Url;

use crate::config::ShopConfig;
use crate::services::category_tree::CategoryTree;
use crate::services::email::EmailService;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid base_url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("base_url must use http or https")]
    UnsupportedScheme,
    #[error("SMTP configuration error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ShopConfig,
    pool: PgPool,
    email: Option<EmailService>,
    categories: CategoryTree,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Email is disabled when `config.email` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the SMTP relay cannot be
    /// configured.
    pub fn new(config: ShopConfig, pool: PgPool) -> Result<Self, StateError> {
        let url = Url::parse(&config.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(StateError::UnsupportedScheme);
        }

        let email = config
            .email
            .as_ref()
            .map(|email| EmailService::new(email, &config.store.name))
            .transpose()?;
        if email.is_none() {
            tracing::warn!("SMTP_HOST not set, order emails are disabled");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
                categories: CategoryTree::new(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ShopConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The email service, if SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// The cached category tree.
    #[must_use]
    pub fn categories(&self) -> &CategoryTree {
        &self.inner.categories
    }
}
