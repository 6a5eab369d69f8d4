//! Session cart routes.
//!
//! The cart lives in the visitor's session as a [`Cart`]. Lines carry a
//! price snapshot for display; checkout re-prices everything from the
//! database.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Serialize;
use shoply_core::cart::{Cart, CartLine, CartTotals, LineKey};
use shoply_core::CurrencyCode;
use tower_sessions::Session;
use tracing::instrument;

use crate::db::ProductRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::order::normalize_items;
use crate::models::{CheckoutDetails, OrderItemRequest, PlacedOrder, Product, session_keys};
use crate::services::orders;
use crate::state::AppState;

/// A cart line with its line total.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    #[serde(flatten)]
    pub line: CartLine,
    pub line_total: Decimal,
}

/// Cart as returned by every cart route.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    #[serde(flatten)]
    pub totals: CartTotals,
    pub currency: CurrencyCode,
}

impl CartView {
    fn new(cart: &Cart, state: &AppState) -> Self {
        let store = &state.config().store;
        Self {
            items: cart
                .lines()
                .iter()
                .map(|line| CartItemView {
                    line: line.clone(),
                    line_total: line.line_total(),
                })
                .collect(),
            totals: cart.totals(&store.shipping),
            currency: store.currency,
        }
    }
}

async fn load_cart(session: &Session) -> Result<Cart> {
    Ok(session
        .get::<Cart>(session_keys::CART)
        .await?
        .unwrap_or_default())
}

async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

/// Build a cart line from a product, checking it can be bought in this
/// quantity. `already_in_cart` counts units of the same line already held.
fn line_for(product: &Product, request: &OrderItemRequest, already_in_cart: u32) -> Result<CartLine> {
    if !product.is_active {
        return Err(AppError::BadRequest(format!(
            "product {} is not available",
            product.id
        )));
    }

    let variant = match request.variant_id {
        Some(variant_id) => Some(
            product
                .variants
                .iter()
                .find(|v| v.id == variant_id)
                .ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "variant {variant_id} does not belong to product {}",
                        product.id
                    ))
                })?,
        ),
        None => None,
    };

    let (unit_price, stock) = variant.map_or((product.effective_price(), product.stock), |v| {
        (product.variant_price(v), v.stock)
    });
    let wanted = already_in_cart.saturating_add(request.quantity);
    let available = u32::try_from(stock).unwrap_or(0);
    if wanted > available {
        return Err(AppError::BadRequest(format!(
            "only {available} of {} in stock",
            product.name
        )));
    }

    Ok(CartLine {
        product_id: product.id,
        variant_id: request.variant_id,
        name: product.name.clone(),
        variant_name: variant.map(|v| v.name.clone()),
        image: product.main_image().map(str::to_string),
        unit_price,
        quantity: request.quantity,
    })
}

async fn priced_line(state: &AppState, request: &OrderItemRequest, already_in_cart: u32) -> Result<CartLine> {
    let product = ProductRepository::new(state.pool())
        .get(request.product_id)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(format!("product {} is not available", request.product_id))
        })?;
    line_for(&product, request, already_in_cart)
}

fn quantity_of(cart: &Cart, key: LineKey) -> u32 {
    cart.lines()
        .iter()
        .find(|l| l.key() == key)
        .map_or(0, |l| l.quantity)
}

/// `GET /api/cart`
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let cart = load_cart(&session).await?;
    Ok(Json(CartView::new(&cart, &state)))
}

/// `POST /api/cart/items` - add a line, merging with an existing one.
#[instrument(skip(state, session))]
pub async fn add_item(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<OrderItemRequest>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    let key = LineKey {
        product_id: request.product_id,
        variant_id: request.variant_id,
    };

    let line = priced_line(&state, &request, quantity_of(&cart, key)).await?;
    cart.add(line)?;
    save_cart(&session, &cart).await?;

    Ok(Json(CartView::new(&cart, &state)))
}

/// `PATCH /api/cart/items` - set a line's quantity; 0 removes it.
#[instrument(skip(state, session))]
pub async fn update_item(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<OrderItemRequest>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    let key = LineKey {
        product_id: request.product_id,
        variant_id: request.variant_id,
    };

    if request.quantity > 0 {
        // Re-check stock for the new absolute quantity.
        priced_line(&state, &request, 0).await?;
    }
    cart.set_quantity(key, request.quantity)?;
    save_cart(&session, &cart).await?;

    Ok(Json(CartView::new(&cart, &state)))
}

/// `DELETE /api/cart/items`
#[instrument(skip(state, session))]
pub async fn remove_item(
    State(state): State<AppState>,
    session: Session,
    Json(key): Json<LineKey>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    cart.remove(key)?;
    save_cart(&session, &cart).await?;
    Ok(Json(CartView::new(&cart, &state)))
}

/// `DELETE /api/cart`
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let cart = Cart::new();
    save_cart(&session, &cart).await?;
    Ok(Json(CartView::new(&cart, &state)))
}

/// `POST /api/cart/checkout` - place an order from the session cart.
///
/// The cart is emptied only after the order is committed.
#[instrument(skip(state, session, details))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    Json(mut details): Json<CheckoutDetails>,
) -> Result<(StatusCode, Json<PlacedOrder>)> {
    details.validate().map_err(AppError::BadRequest)?;

    let mut cart = load_cart(&session).await?;
    if cart.is_empty() {
        return Err(AppError::BadRequest("cart is empty".to_string()));
    }

    let requested: Vec<OrderItemRequest> = cart
        .lines()
        .iter()
        .map(|line| OrderItemRequest {
            product_id: line.product_id,
            variant_id: line.variant_id,
            quantity: line.quantity,
        })
        .collect();
    let items = normalize_items(&requested).map_err(AppError::BadRequest)?;

    add_breadcrumb("checkout", "Checkout from session cart", None);
    let placed = orders::place_order(&state, &details, &items).await?;

    cart.clear();
    save_cart(&session, &cart).await?;

    Ok((StatusCode::CREATED, Json(placed)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use shoply_core::{ProductId, VariantId};

    use super::*;
    use crate::models::ProductVariant;

    fn product() -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(7),
            name: "Linen Shirt".to_string(),
            slug: "linen-shirt".to_string(),
            description: String::new(),
            price: Decimal::new(1200, 0),
            sale_price: Some(Decimal::new(990, 0)),
            stock: 3,
            category_id: None,
            images: vec!["/uploads/shirt.jpg".to_string()],
            is_active: true,
            is_featured: false,
            variants: vec![ProductVariant {
                id: VariantId::new(70),
                product_id: ProductId::new(7),
                name: "XL".to_string(),
                color: None,
                size: Some("XL".to_string()),
                sku: Some("LS-XL".to_string()),
                stock: 1,
                price: Some(Decimal::new(1100, 0)),
                position: 0,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    fn request(variant: Option<i32>, quantity: u32) -> OrderItemRequest {
        OrderItemRequest {
            product_id: ProductId::new(7),
            variant_id: variant.map(VariantId::new),
            quantity,
        }
    }

    #[test]
    fn test_line_uses_sale_price_and_image() {
        let line = line_for(&product(), &request(None, 2), 0).unwrap();
        assert_eq!(line.unit_price, Decimal::new(990, 0));
        assert_eq!(line.image.as_deref(), Some("/uploads/shirt.jpg"));
        assert_eq!(line.variant_name, None);
    }

    #[test]
    fn test_variant_line_uses_override_and_variant_stock() {
        let line = line_for(&product(), &request(Some(70), 1), 0).unwrap();
        assert_eq!(line.unit_price, Decimal::new(1100, 0));
        assert_eq!(line.variant_name.as_deref(), Some("XL"));

        let err = line_for(&product(), &request(Some(70), 2), 0).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_stock_counts_units_already_in_cart() {
        assert!(line_for(&product(), &request(None, 1), 2).is_ok());
        assert!(line_for(&product(), &request(None, 2), 2).is_err());
    }

    #[test]
    fn test_unknown_variant_and_inactive_product() {
        assert!(line_for(&product(), &request(Some(99), 1), 0).is_err());

        let mut inactive = product();
        inactive.is_active = false;
        assert!(line_for(&inactive, &request(None, 1), 0).is_err());
    }
}
