//! Category models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shoply_core::CategoryId;

use super::{deserialize_some, optional_text, required_text};

/// A category row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A category with its children, for the storefront tree.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

/// Minimal reference used in breadcrumbs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

impl From<&Category> for CategoryRef {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            slug: category.slug.clone(),
        }
    }
}

/// Storefront category page data.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    /// Ancestors from the root down to the parent.
    pub breadcrumbs: Vec<CategoryRef>,
    pub children: Vec<Category>,
}

/// Create/replace body.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
}

impl CategoryInput {
    /// # Errors
    ///
    /// Returns a message suitable for a 400 response.
    pub fn validate(&mut self) -> Result<(), String> {
        self.name = required_text(&self.name, "name")?;
        self.description = optional_text(self.description.as_deref());
        self.image_url = optional_text(self.image_url.as_deref());
        Ok(())
    }
}

/// `PATCH /admin/api/categories/{id}/move`.
///
/// `parent_id` absent keeps the parent; `null` moves to the root level.
#[derive(Debug, Clone, Deserialize)]
pub struct MoveCategory {
    pub order: i32,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub parent_id: Option<Option<CategoryId>>,
}

/// `PATCH /admin/api/categories/reorder`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReorderCategories {
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    pub ids: Vec<CategoryId>,
}
