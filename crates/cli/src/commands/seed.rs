//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! categories:
//!   - name: Clothing
//!     children:
//!       - name: Shirts
//!         slug: shirts
//! products:
//!   - name: Linen Shirt
//!     category: shirts
//!     price: "1290"
//!     stock: 10
//!     variants:
//!       - { name: M, size: M, stock: 4 }
//! banners:
//!   - { title: Summer sale, image_url: /uploads/summer.jpg }
//! feature_icons:
//!   - { title: Free shipping, icon: truck }
//! ```
//!
//! Categories and products whose slug already exists are skipped, so the
//! same file can be applied twice. Banners and feature icons are only
//! inserted into empty tables.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use shoply_core::{CategoryId, Slug};
use shoply_server::db::{
    BannerRepository, CategoryRepository, FeatureIconRepository, ProductRepository,
};
use shoply_server::models::{BannerInput, CategoryInput, FeatureIconInput, ProductInput};
use sqlx::PgPool;
use tracing::{error, info};

use super::{CommandError, connect};

/// Top-level seed document.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
    #[serde(default)]
    pub banners: Vec<BannerInput>,
    #[serde(default)]
    pub feature_icons: Vec<FeatureIconInput>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub children: Vec<SeedCategory>,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    /// Category slug.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(flatten)]
    pub input: ProductInput,
}

/// A category ready to insert, parents listed before children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCategory {
    pub slug: String,
    pub parent_slug: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Flatten the category tree breadth-first, resolving slugs.
pub fn plan_categories(roots: &[SeedCategory]) -> Result<Vec<PlannedCategory>, String> {
    let mut planned = Vec::new();
    let mut level: Vec<(Option<String>, &SeedCategory)> =
        roots.iter().map(|c| (None, c)).collect();

    while !level.is_empty() {
        let mut next = Vec::new();
        for (parent_slug, category) in level {
            let slug = Slug::explicit_or_from_name(category.slug.as_deref(), &category.name)
                .map_err(|e| format!("category '{}': {e}", category.name))?;
            let slug = slug.as_str().to_string();

            next.extend(
                category
                    .children
                    .iter()
                    .map(|child| (Some(slug.clone()), child)),
            );
            planned.push(PlannedCategory {
                slug,
                parent_slug,
                name: category.name.trim().to_string(),
                description: category.description.clone(),
                image_url: category.image_url.clone(),
            });
        }
        level = next;
    }
    Ok(planned)
}

impl SeedFile {
    /// Check the whole file before touching the database, collecting every
    /// problem. Inputs are trimmed in place.
    pub fn validate(&mut self) -> Vec<String> {
        let mut errors = Vec::new();

        let category_slugs: Vec<String> = match plan_categories(&self.categories) {
            Ok(planned) => planned.into_iter().map(|c| c.slug).collect(),
            Err(e) => {
                errors.push(e);
                Vec::new()
            }
        };
        let mut seen = HashSet::new();
        for slug in &category_slugs {
            if !seen.insert(slug.as_str()) {
                errors.push(format!("duplicate category slug '{slug}'"));
            }
        }

        let mut product_slugs = HashSet::new();
        for product in &mut self.products {
            let label = product.input.name.clone();
            if let Err(e) = product.input.validate() {
                errors.push(format!("product '{label}': {e}"));
                continue;
            }
            match Slug::explicit_or_from_name(product.input.slug.as_deref(), &product.input.name) {
                Ok(slug) => {
                    if !product_slugs.insert(slug.as_str().to_string()) {
                        errors.push(format!("duplicate product slug '{slug}'"));
                    }
                }
                Err(e) => errors.push(format!("product '{label}': {e}")),
            }
            if let Some(category) = &product.category
                && !category_slugs.contains(category)
            {
                errors.push(format!(
                    "product '{label}': unknown category '{category}'"
                ));
            }
        }

        for banner in &mut self.banners {
            if let Err(e) = banner.validate() {
                errors.push(format!("banner: {e}"));
            }
        }
        for icon in &mut self.feature_icons {
            if let Err(e) = icon.validate() {
                errors.push(format!("feature icon: {e}"));
            }
        }
        errors
    }
}

/// Load, validate and apply a seed file.
pub async fn run(path: &Path) -> Result<(), CommandError> {
    info!(path = %path.display(), "Loading seed file");
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Io {
            path: path.display().to_string(),
            source,
        })?;
    let mut seed: SeedFile = serde_yaml::from_str(&content)?;

    let errors = seed.validate();
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(CommandError::InvalidSeed(errors.len()));
    }

    let pool = connect().await?;
    let categories = seed_categories(&pool, &seed.categories).await?;
    seed_products(&pool, seed.products, &categories).await?;
    seed_content(&pool, &seed.banners, &seed.feature_icons).await?;

    info!("Seeding complete");
    Ok(())
}

async fn seed_categories(
    pool: &PgPool,
    roots: &[SeedCategory],
) -> Result<HashMap<String, CategoryId>, CommandError> {
    let repo = CategoryRepository::new(pool);
    let planned = plan_categories(roots).map_err(|_| CommandError::InvalidSeed(1))?;

    let mut ids = HashMap::new();
    let (mut inserted, mut skipped) = (0, 0);
    for category in planned {
        if let Some(existing) = repo.get_by_slug(&category.slug).await? {
            ids.insert(category.slug, existing.id);
            skipped += 1;
            continue;
        }

        let input = CategoryInput {
            name: category.name,
            slug: Some(category.slug.clone()),
            description: category.description,
            image_url: category.image_url,
            parent_id: category
                .parent_slug
                .as_ref()
                .and_then(|slug| ids.get(slug).copied()),
        };
        let created = repo.create(&input, &category.slug).await?;
        ids.insert(category.slug, created.id);
        inserted += 1;
    }

    info!(inserted, skipped, "Categories seeded");
    Ok(ids)
}

async fn seed_products(
    pool: &PgPool,
    products: Vec<SeedProduct>,
    categories: &HashMap<String, CategoryId>,
) -> Result<(), CommandError> {
    let repo = ProductRepository::new(pool);
    let (mut inserted, mut skipped) = (0, 0);

    for product in products {
        let mut input = product.input;
        let slug = Slug::explicit_or_from_name(input.slug.as_deref(), &input.name)
            .map_err(|_| CommandError::InvalidSeed(1))?;
        if repo.slug_exists(slug.as_str(), None).await? {
            skipped += 1;
            continue;
        }

        input.category_id = product
            .category
            .as_ref()
            .and_then(|slug| categories.get(slug).copied());
        repo.create(&input, slug.as_str()).await?;
        inserted += 1;
    }

    info!(inserted, skipped, "Products seeded");
    Ok(())
}

async fn seed_content(
    pool: &PgPool,
    banners: &[BannerInput],
    icons: &[FeatureIconInput],
) -> Result<(), CommandError> {
    let banner_repo = BannerRepository::new(pool);
    if banner_repo.list(false).await?.is_empty() {
        for banner in banners {
            banner_repo.create(banner).await?;
        }
        info!(count = banners.len(), "Banners seeded");
    } else {
        info!("Banners already present, skipping");
    }

    let icon_repo = FeatureIconRepository::new(pool);
    if icon_repo.list(false).await?.is_empty() {
        for icon in icons {
            icon_repo.create(icon).await?;
        }
        info!(count = icons.len(), "Feature icons seeded");
    } else {
        info!("Feature icons already present, skipping");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    const SAMPLE: &str = r#"
categories:
  - name: Clothing
    children:
      - name: Shirts
        slug: shirts
      - name: Trousers
  - name: Home
products:
  - name: Linen Shirt
    category: shirts
    price: "1290"
    stock: 10
    variants:
      - { name: M, size: M, stock: 4 }
  - name: Mug
    price: "199.90"
banners:
  - { title: Summer sale, image_url: /uploads/summer.jpg }
feature_icons:
  - { title: Free shipping, icon: truck }
"#;

    #[test]
    fn test_parse_sample() {
        let seed: SeedFile = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(seed.categories.len(), 2);
        assert_eq!(seed.products.len(), 2);
        assert_eq!(seed.products[0].category.as_deref(), Some("shirts"));
        assert_eq!(seed.products[1].input.price, Decimal::new(19990, 2));
        assert_eq!(seed.banners.len(), 1);
        assert_eq!(seed.feature_icons.len(), 1);
    }

    #[test]
    fn test_plan_lists_parents_first() {
        let seed: SeedFile = serde_yaml::from_str(SAMPLE).unwrap();
        let planned = plan_categories(&seed.categories).unwrap();
        let slugs: Vec<&str> = planned.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs, vec!["clothing", "home", "shirts", "trousers"]);
        assert_eq!(planned[2].parent_slug.as_deref(), Some("clothing"));
        assert_eq!(planned[0].parent_slug, None);
    }

    #[test]
    fn test_valid_sample_has_no_errors() {
        let mut seed: SeedFile = serde_yaml::from_str(SAMPLE).unwrap();
        assert!(seed.validate().is_empty());
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let yaml = r#"
categories:
  - name: Shirts
  - name: shirts
products:
  - name: Ghost
    category: nowhere
    price: "10"
  - name: "  "
    price: "10"
"#;
        let mut seed: SeedFile = serde_yaml::from_str(yaml).unwrap();
        let errors = seed.validate();
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("duplicate category slug")));
        assert!(errors.iter().any(|e| e.contains("unknown category 'nowhere'")));
        assert!(errors.iter().any(|e| e.contains("name is required")));
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        assert!(serde_yaml::from_str::<SeedFile>("customers: []").is_err());
    }
}
