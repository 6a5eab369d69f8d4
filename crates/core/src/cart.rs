//! Shopping cart state and derived totals.
//!
//! The cart is a plain serializable value. The server keeps it in the
//! visitor's session; clients that keep their own cart send the lines inline
//! at checkout. Totals are always derived, never stored.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{DeliveryMethod, ProductId, VariantId, round_money};

/// Upper bound on the quantity of a single cart line.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Errors from cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("quantity must be at most {max}")]
    QuantityTooLarge { max: u32 },
    #[error("item is not in the cart")]
    LineNotFound,
}

/// Identifies a cart line: one product, optionally narrowed to a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
}

/// One product (or variant) in the cart with a price snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl CartLine {
    /// The key this line merges on.
    #[must_use]
    pub const fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product_id,
            variant_id: self.variant_id,
        }
    }

    /// `unit_price * quantity`, rounded to cents.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        round_money(self.unit_price * Decimal::from(self.quantity))
    }
}

/// Shipping fee rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    /// Fee charged below the free-shipping threshold.
    pub flat_fee: Decimal,
    /// Subtotal from which shipping is free; `None` disables the threshold.
    pub free_from: Option<Decimal>,
}

impl ShippingPolicy {
    /// Shipping price for a given subtotal and delivery method.
    ///
    /// An empty order ships for free.
    #[must_use]
    pub fn shipping_for(&self, subtotal: Decimal, delivery: DeliveryMethod) -> Decimal {
        if subtotal <= Decimal::ZERO || delivery.is_free() {
            return Decimal::ZERO;
        }
        match self.free_from {
            Some(threshold) if subtotal >= threshold => Decimal::ZERO,
            _ => self.flat_fee,
        }
    }
}

/// Derived cart totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub item_count: u32,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

/// A visitor's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add a line, merging with an existing line for the same key.
    ///
    /// When merging, the price and labels of the incoming line replace the
    /// stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the quantity is zero or the merged quantity would
    /// exceed [`MAX_LINE_QUANTITY`].
    pub fn add(&mut self, line: CartLine) -> Result<(), CartError> {
        if line.quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        let key = line.key();
        if let Some(existing) = self.lines.iter_mut().find(|l| l.key() == key) {
            let merged = existing.quantity.saturating_add(line.quantity);
            if merged > MAX_LINE_QUANTITY {
                return Err(CartError::QuantityTooLarge {
                    max: MAX_LINE_QUANTITY,
                });
            }
            *existing = CartLine {
                quantity: merged,
                ..line
            };
            return Ok(());
        }

        if line.quantity > MAX_LINE_QUANTITY {
            return Err(CartError::QuantityTooLarge {
                max: MAX_LINE_QUANTITY,
            });
        }
        self.lines.push(line);
        Ok(())
    }

    /// Set the quantity of an existing line. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not exist or the quantity is too large.
    pub fn set_quantity(&mut self, key: LineKey, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(key);
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::QuantityTooLarge {
                max: MAX_LINE_QUANTITY,
            });
        }
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.key() == key)
            .ok_or(CartError::LineNotFound)?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the key is not in the cart.
    pub fn remove(&mut self, key: LineKey) -> Result<(), CartError> {
        let before = self.lines.len();
        self.lines.retain(|l| l.key() != key);
        if self.lines.len() == before {
            return Err(CartError::LineNotFound);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Totals for display, assuming a paid delivery method.
    #[must_use]
    pub fn totals(&self, policy: &ShippingPolicy) -> CartTotals {
        self.totals_for(policy, DeliveryMethod::Courier)
    }

    /// Totals for a specific delivery method.
    #[must_use]
    pub fn totals_for(&self, policy: &ShippingPolicy, delivery: DeliveryMethod) -> CartTotals {
        let subtotal: Decimal = self.lines.iter().map(CartLine::line_total).sum();
        let item_count = self.lines.iter().map(|l| l.quantity).sum();
        let shipping = policy.shipping_for(subtotal, delivery);
        CartTotals {
            item_count,
            subtotal,
            shipping,
            total: subtotal + shipping,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(product: i32, variant: Option<i32>, price: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(product),
            variant_id: variant.map(VariantId::new),
            name: format!("Product {product}"),
            variant_name: None,
            image: None,
            unit_price: Decimal::new(price, 0),
            quantity,
        }
    }

    fn policy() -> ShippingPolicy {
        ShippingPolicy {
            flat_fee: Decimal::new(99, 0),
            free_from: Some(Decimal::new(2000, 0)),
        }
    }

    #[test]
    fn test_add_merges_same_key() {
        let mut cart = Cart::new();
        cart.add(line(1, None, 100, 1)).unwrap();
        cart.add(line(1, None, 100, 2)).unwrap();
        cart.add(line(1, Some(5), 100, 1)).unwrap();

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn test_add_refreshes_price_snapshot() {
        let mut cart = Cart::new();
        cart.add(line(1, None, 100, 1)).unwrap();
        cart.add(line(1, None, 80, 1)).unwrap();

        assert_eq!(cart.lines()[0].unit_price, Decimal::new(80, 0));
    }

    #[test]
    fn test_add_rejects_bad_quantities() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(line(1, None, 100, 0)), Err(CartError::ZeroQuantity));
        cart.add(line(1, None, 100, 98)).unwrap();
        assert_eq!(
            cart.add(line(1, None, 100, 2)),
            Err(CartError::QuantityTooLarge { max: 99 })
        );
        assert_eq!(cart.lines()[0].quantity, 98);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::new();
        cart.add(line(1, None, 100, 2)).unwrap();
        let key = cart.lines()[0].key();

        cart.set_quantity(key, 5).unwrap();
        assert_eq!(cart.lines()[0].quantity, 5);

        cart.set_quantity(key, 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.set_quantity(key, 1), Err(CartError::LineNotFound));
    }

    #[test]
    fn test_totals_below_threshold_pay_shipping() {
        let mut cart = Cart::new();
        cart.add(line(1, None, 250, 2)).unwrap();
        cart.add(line(2, None, 100, 1)).unwrap();

        let totals = cart.totals(&policy());
        assert_eq!(totals.item_count, 3);
        assert_eq!(totals.subtotal, Decimal::new(600, 0));
        assert_eq!(totals.shipping, Decimal::new(99, 0));
        assert_eq!(totals.total, Decimal::new(699, 0));
    }

    #[test]
    fn test_totals_free_shipping() {
        let mut cart = Cart::new();
        cart.add(line(1, None, 1000, 2)).unwrap();
        assert_eq!(cart.totals(&policy()).shipping, Decimal::ZERO);

        let mut small = Cart::new();
        small.add(line(1, None, 10, 1)).unwrap();
        let pickup = small.totals_for(&policy(), DeliveryMethod::PersonalPickup);
        assert_eq!(pickup.shipping, Decimal::ZERO);
    }

    #[test]
    fn test_empty_cart_ships_free() {
        let totals = Cart::new().totals(&policy());
        assert_eq!(totals.total, Decimal::ZERO);
        assert_eq!(totals.item_count, 0);
    }

    #[test]
    fn test_cart_survives_json() {
        let mut cart = Cart::new();
        cart.add(line(3, Some(7), 199, 1)).unwrap();
        let json = serde_json::to_string(&cart).unwrap();
        let back: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cart);
    }
}
