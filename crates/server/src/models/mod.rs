//! Domain models for the storefront API and the admin back-office.
//!
//! Each entity has a response type (`Serialize`) and, where admins can write
//! it, an input type (`Deserialize`) with a `validate` method returning a
//! human-readable message for 400 responses.

pub mod category;
pub mod content;
pub mod invoice;
pub mod order;
pub mod product;
pub mod session;

use serde::{Deserialize, Deserializer, Serialize};

pub use category::{Category, CategoryDetail, CategoryInput, CategoryNode, CategoryRef};
pub use content::{Banner, BannerInput, FeatureIcon, FeatureIconInput};
pub use invoice::Invoice;
pub use order::{
    CheckoutDetails, CreateOrderRequest, Order, OrderDetail, OrderHistoryEntry, OrderItem,
    OrderItemRequest, PlacedOrder, UpdateOrderRequest,
};
pub use product::{Product, ProductFilter, ProductInput, ProductPatch, ProductSort, ProductVariant};
pub use session::keys as session_keys;

/// Default page size for listings.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

/// `?page=&per_page=` query parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: first_page(),
            per_page: default_per_page(),
        }
    }
}

const fn first_page() -> u32 {
    1
}

const fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

/// Distinguish an absent field from an explicit `null` in PATCH bodies.
///
/// Use with `#[serde(default, deserialize_with = "deserialize_some")]` on an
/// `Option<Option<T>>` field.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Trim a required text field, rejecting blank values.
pub(crate) fn required_text(value: &str, field: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} is required"));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field, turning blank values into `None`.
pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
