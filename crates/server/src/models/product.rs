//! Product and variant models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shoply_core::{CategoryId, ProductId, VariantId};

use super::{deserialize_some, optional_text, required_text};

/// Maximum number of images per product.
pub const MAX_IMAGES: usize = 20;

/// A catalog product with its variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub stock: i32,
    pub category_id: Option<CategoryId>,
    /// Image URLs, first one is the main image.
    pub images: Vec<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub variants: Vec<ProductVariant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The price a customer pays for the base product.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        effective_price(self.price, self.sale_price)
    }

    /// The price a customer pays for a variant (override, then sale, then price).
    #[must_use]
    pub fn variant_price(&self, variant: &ProductVariant) -> Decimal {
        variant.price.unwrap_or_else(|| self.effective_price())
    }

    #[must_use]
    pub fn main_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// Sale price wins when it is set and lower than the list price.
#[must_use]
pub fn effective_price(price: Decimal, sale_price: Option<Decimal>) -> Decimal {
    match sale_price {
        Some(sale) if sale < price => sale,
        _ => price,
    }
}

/// A product sub-SKU (color/size) with its own stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub sku: Option<String>,
    pub stock: i32,
    /// Overrides the product price when set.
    pub price: Option<Decimal>,
    pub position: i32,
}

/// Full product body for create and replace (`POST`, `PUT`).
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    /// Derived from `name` when absent.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    /// Variants to keep; existing variants missing from the list are removed.
    /// `None` leaves variants untouched on replace.
    #[serde(default)]
    pub variants: Option<Vec<VariantInput>>,
}

const fn default_true() -> bool {
    true
}

/// A variant in a product body. Entries with an `id` update that variant.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantInput {
    #[serde(default)]
    pub id: Option<VariantId>,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub price: Option<Decimal>,
}

impl ProductInput {
    /// Trim text fields and check value ranges.
    ///
    /// # Errors
    ///
    /// Returns a message suitable for a 400 response.
    pub fn validate(&mut self) -> Result<(), String> {
        self.name = required_text(&self.name, "name")?;
        self.description = self.description.trim().to_string();
        validate_price(self.price, "price")?;
        if let Some(sale) = self.sale_price {
            validate_price(sale, "sale_price")?;
        }
        if self.stock < 0 {
            return Err("stock must not be negative".to_string());
        }
        self.images = normalize_images(&self.images)?;

        if let Some(variants) = &mut self.variants {
            for variant in variants.iter_mut() {
                variant.validate()?;
            }
        }
        Ok(())
    }
}

impl VariantInput {
    fn validate(&mut self) -> Result<(), String> {
        self.name = required_text(&self.name, "variant name")?;
        self.color = optional_text(self.color.as_deref());
        self.size = optional_text(self.size.as_deref());
        self.sku = optional_text(self.sku.as_deref());
        if self.stock < 0 {
            return Err("variant stock must not be negative".to_string());
        }
        if let Some(price) = self.price {
            validate_price(price, "variant price")?;
        }
        Ok(())
    }
}

/// Partial update (`PATCH`). Absent fields are untouched; `null` clears
/// nullable fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub sale_price: Option<Option<Decimal>>,
    #[serde(default)]
    pub stock: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub category_id: Option<Option<CategoryId>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_featured: Option<bool>,
}

impl ProductPatch {
    /// # Errors
    ///
    /// Returns a message suitable for a 400 response.
    pub fn validate(&mut self) -> Result<(), String> {
        if let Some(name) = &self.name {
            self.name = Some(required_text(name, "name")?);
        }
        if let Some(price) = self.price {
            validate_price(price, "price")?;
        }
        if let Some(Some(sale)) = self.sale_price {
            validate_price(sale, "sale_price")?;
        }
        if self.stock.is_some_and(|s| s < 0) {
            return Err("stock must not be negative".to_string());
        }
        Ok(())
    }
}

/// Listing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    /// `ORDER BY` clause over the `p` alias.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "p.created_at DESC, p.id DESC",
            Self::PriceAsc => "COALESCE(LEAST(p.sale_price, p.price), p.price) ASC, p.id",
            Self::PriceDesc => "COALESCE(LEAST(p.sale_price, p.price), p.price) DESC, p.id",
            Self::Name => "p.name ASC, p.id",
        }
    }
}

/// Query parameters for product listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    /// Category slug; includes products of descendant categories.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub sort: ProductSort,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
    /// Admin listings also see inactive products.
    #[serde(skip)]
    pub include_inactive: bool,
}

fn validate_price(price: Decimal, field: &str) -> Result<(), String> {
    if price < Decimal::ZERO {
        return Err(format!("{field} must not be negative"));
    }
    if price.scale() > 2 {
        return Err(format!("{field} must have at most two decimal places"));
    }
    Ok(())
}

fn normalize_images(images: &[String]) -> Result<Vec<String>, String> {
    let images: Vec<String> = images
        .iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect();
    if images.len() > MAX_IMAGES {
        return Err(format!("at most {MAX_IMAGES} images are allowed"));
    }
    Ok(images)
}
