//! Database operations for homepage banners.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use shoply_core::BannerId;

use super::RepositoryError;
use crate::models::{Banner, BannerInput};

const BANNER_COLUMNS: &str = "id, title, subtitle, image_url, link_url, button_text, position, \
    is_active, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct BannerRow {
    id: i32,
    title: String,
    subtitle: Option<String>,
    image_url: String,
    link_url: Option<String>,
    button_text: Option<String>,
    position: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BannerRow> for Banner {
    fn from(row: BannerRow) -> Self {
        Self {
            id: BannerId::new(row.id),
            title: row.title,
            subtitle: row.subtitle,
            image_url: row.image_url,
            link_url: row.link_url,
            button_text: row.button_text,
            position: row.position,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for banner database operations.
pub struct BannerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BannerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All banners by position, or only active ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, active_only: bool) -> Result<Vec<Banner>, RepositoryError> {
        let sql = format!(
            "SELECT {BANNER_COLUMNS} FROM shop.banner WHERE ($1 = FALSE OR is_active) ORDER BY position, id"
        );
        let rows = sqlx::query_as::<_, BannerRow>(&sql)
            .bind(active_only)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: BannerId) -> Result<Option<Banner>, RepositoryError> {
        let sql = format!("SELECT {BANNER_COLUMNS} FROM shop.banner WHERE id = $1");
        let row = sqlx::query_as::<_, BannerRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, input: &BannerInput) -> Result<Banner, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO shop.banner (title, subtitle, image_url, link_url, button_text, position, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {BANNER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, BannerRow>(&sql)
            .bind(&input.title)
            .bind(input.subtitle.as_deref())
            .bind(&input.image_url)
            .bind(input.link_url.as_deref())
            .bind(input.button_text.as_deref())
            .bind(input.position)
            .bind(input.is_active)
            .fetch_one(self.pool)
            .await?;
        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner does not exist.
    pub async fn update(&self, id: BannerId, input: &BannerInput) -> Result<Banner, RepositoryError> {
        let sql = format!(
            r"
            UPDATE shop.banner
            SET title = $2, subtitle = $3, image_url = $4, link_url = $5,
                button_text = $6, position = $7, is_active = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {BANNER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, BannerRow>(&sql)
            .bind(id)
            .bind(&input.title)
            .bind(input.subtitle.as_deref())
            .bind(&input.image_url)
            .bind(input.link_url.as_deref())
            .bind(input.button_text.as_deref())
            .bind(input.position)
            .bind(input.is_active)
            .fetch_optional(self.pool)
            .await?;
        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner does not exist.
    pub async fn delete(&self, id: BannerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.banner WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
