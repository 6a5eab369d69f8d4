//! Database operations for feature icons.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use shoply_core::FeatureIconId;

use super::RepositoryError;
use crate::models::{FeatureIcon, FeatureIconInput};

const ICON_COLUMNS: &str =
    "id, title, description, icon, position, is_active, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct FeatureIconRow {
    id: i32,
    title: String,
    description: Option<String>,
    icon: String,
    position: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FeatureIconRow> for FeatureIcon {
    fn from(row: FeatureIconRow) -> Self {
        Self {
            id: FeatureIconId::new(row.id),
            title: row.title,
            description: row.description,
            icon: row.icon,
            position: row.position,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for feature icon database operations.
pub struct FeatureIconRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FeatureIconRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, active_only: bool) -> Result<Vec<FeatureIcon>, RepositoryError> {
        let sql = format!(
            "SELECT {ICON_COLUMNS} FROM shop.feature_icon WHERE ($1 = FALSE OR is_active) ORDER BY position, id"
        );
        let rows = sqlx::query_as::<_, FeatureIconRow>(&sql)
            .bind(active_only)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: FeatureIconId) -> Result<Option<FeatureIcon>, RepositoryError> {
        let sql = format!("SELECT {ICON_COLUMNS} FROM shop.feature_icon WHERE id = $1");
        let row = sqlx::query_as::<_, FeatureIconRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, input: &FeatureIconInput) -> Result<FeatureIcon, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO shop.feature_icon (title, description, icon, position, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ICON_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, FeatureIconRow>(&sql)
            .bind(&input.title)
            .bind(input.description.as_deref())
            .bind(&input.icon)
            .bind(input.position)
            .bind(input.is_active)
            .fetch_one(self.pool)
            .await?;
        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the icon does not exist.
    pub async fn update(
        &self,
        id: FeatureIconId,
        input: &FeatureIconInput,
    ) -> Result<FeatureIcon, RepositoryError> {
        let sql = format!(
            r"
            UPDATE shop.feature_icon
            SET title = $2, description = $3, icon = $4, position = $5,
                is_active = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {ICON_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, FeatureIconRow>(&sql)
            .bind(id)
            .bind(&input.title)
            .bind(input.description.as_deref())
            .bind(&input.icon)
            .bind(input.position)
            .bind(input.is_active)
            .fetch_optional(self.pool)
            .await?;
        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the icon does not exist.
    pub async fn delete(&self, id: FeatureIconId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.feature_icon WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
