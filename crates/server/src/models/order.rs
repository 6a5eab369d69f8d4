//! Order models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shoply_core::cart::MAX_LINE_QUANTITY;
use shoply_core::order_flow::OrderPatch;
use shoply_core::{
    CurrencyCode, DeliveryMethod, Email, OrderHistoryId, OrderId, OrderStatus, PaymentMethod,
    PaymentStatus, ProductId, VariantId,
};

use super::{Invoice, optional_text, required_text};

/// Maximum number of lines in one order.
pub const MAX_ORDER_LINES: usize = 100;

/// A stored order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: i64,
    #[serde(flatten)]
    pub customer: CustomerDetails,
    #[serde(flatten)]
    pub delivery: DeliveryAddress,
    pub delivery_method: DeliveryMethod,
    pub payment_method: PaymentMethod,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub shipping_price: Decimal,
    pub total: Decimal,
    pub currency: CurrencyCode,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub tracking_number: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub fn customer_name(&self) -> String {
        format!("{} {}", self.customer.first_name, self.customer.last_name)
    }
}

/// Billing identity and address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub zip: String,
    pub country: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub vat_id: Option<String>,
}

impl CustomerDetails {
    /// Trim fields, check required ones and normalize the email.
    ///
    /// # Errors
    ///
    /// Returns a message suitable for a 400 response.
    pub fn validate(&mut self) -> Result<(), String> {
        self.first_name = required_text(&self.first_name, "first_name")?;
        self.last_name = required_text(&self.last_name, "last_name")?;
        self.email = Email::parse(&self.email)
            .map_err(|e| format!("email: {e}"))?
            .into_inner();
        self.phone = required_text(&self.phone, "phone")?;
        self.street = required_text(&self.street, "street")?;
        self.city = required_text(&self.city, "city")?;
        self.zip = required_text(&self.zip, "zip")?;
        self.country = required_text(&self.country, "country")?;
        self.company = optional_text(self.company.as_deref());
        self.company_id = optional_text(self.company_id.as_deref());
        self.vat_id = optional_text(self.vat_id.as_deref());
        Ok(())
    }
}

/// Optional shipping address when it differs from the billing address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    #[serde(default)]
    pub delivery_name: Option<String>,
    #[serde(default)]
    pub delivery_street: Option<String>,
    #[serde(default)]
    pub delivery_city: Option<String>,
    #[serde(default)]
    pub delivery_zip: Option<String>,
    #[serde(default)]
    pub delivery_country: Option<String>,
}

impl DeliveryAddress {
    /// Trim fields; a partial address is rejected.
    ///
    /// # Errors
    ///
    /// Returns a message suitable for a 400 response.
    pub fn validate(&mut self) -> Result<(), String> {
        self.delivery_name = optional_text(self.delivery_name.as_deref());
        self.delivery_street = optional_text(self.delivery_street.as_deref());
        self.delivery_city = optional_text(self.delivery_city.as_deref());
        self.delivery_zip = optional_text(self.delivery_zip.as_deref());
        self.delivery_country = optional_text(self.delivery_country.as_deref());

        let address = [
            &self.delivery_street,
            &self.delivery_city,
            &self.delivery_zip,
        ];
        let given = address.iter().filter(|f| f.is_some()).count();
        if given != 0 && given != address.len() {
            return Err(
                "delivery address needs delivery_street, delivery_city and delivery_zip"
                    .to_string(),
            );
        }
        Ok(())
    }
}

/// One line of the order's JSON `items` blob, priced at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub name: String,
    #[serde(default)]
    pub variant_name: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub total: Decimal,
}

/// An append-only audit row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderHistoryEntry {
    pub id: OrderHistoryId,
    pub order_id: OrderId,
    pub field: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Admin order page data.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub history: Vec<OrderHistoryEntry>,
    pub invoice: Option<Invoice>,
}

/// Customer, delivery and payment choices submitted at checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutDetails {
    #[serde(flatten)]
    pub customer: CustomerDetails,
    #[serde(flatten)]
    pub delivery: DeliveryAddress,
    #[serde(default)]
    pub delivery_method: DeliveryMethod,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub note: Option<String>,
}

impl CheckoutDetails {
    /// # Errors
    ///
    /// Returns a message suitable for a 400 response.
    pub fn validate(&mut self) -> Result<(), String> {
        self.customer.validate()?;
        self.delivery.validate()?;
        self.note = optional_text(self.note.as_deref());
        Ok(())
    }
}

/// A requested line in `POST /api/orders`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
}

/// `POST /api/orders` body: checkout details plus inline items.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(flatten)]
    pub details: CheckoutDetails,
    pub items: Vec<OrderItemRequest>,
}

/// Merge duplicate lines and check quantities.
///
/// # Errors
///
/// Returns a message suitable for a 400 response.
pub fn normalize_items(items: &[OrderItemRequest]) -> Result<Vec<OrderItemRequest>, String> {
    if items.is_empty() {
        return Err("order has no items".to_string());
    }

    let mut merged: Vec<OrderItemRequest> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity == 0 {
            return Err("quantity must be at least 1".to_string());
        }
        match merged
            .iter_mut()
            .find(|m| m.product_id == item.product_id && m.variant_id == item.variant_id)
        {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => merged.push(*item),
        }
    }

    if merged.len() > MAX_ORDER_LINES {
        return Err(format!("an order may contain at most {MAX_ORDER_LINES} lines"));
    }
    if merged.iter().any(|m| m.quantity > MAX_LINE_QUANTITY) {
        return Err(format!("quantity must be at most {MAX_LINE_QUANTITY}"));
    }
    Ok(merged)
}

/// Response after placing an order.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub id: OrderId,
    pub order_number: i64,
    pub subtotal: Decimal,
    pub shipping_price: Decimal,
    pub total: Decimal,
    pub currency: CurrencyCode,
    pub payment_method: PaymentMethod,
    /// SVG QR code for bank-transfer orders.
    pub payment_qr_url: Option<String>,
}

/// `PUT /admin/api/orders/{id}` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    /// Empty string clears the tracking number.
    #[serde(default)]
    pub tracking_number: Option<String>,
    /// Empty string clears the note.
    #[serde(default)]
    pub note: Option<String>,
}

impl From<UpdateOrderRequest> for OrderPatch {
    fn from(req: UpdateOrderRequest) -> Self {
        Self {
            status: req.status,
            payment_status: req.payment_status,
            tracking_number: req.tracking_number,
            note: req.note,
        }
    }
}

/// `PATCH /admin/api/orders/status` body.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkStatusRequest {
    pub ids: Vec<OrderId>,
    pub status: OrderStatus,
}

/// Per-order outcome of a bulk status update.
#[derive(Debug, Clone, Serialize)]
pub struct BulkStatusResult {
    pub id: OrderId,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `GET /admin/api/orders` query.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct OrderFilter {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(product: i32, variant: Option<i32>, quantity: u32) -> OrderItemRequest {
        OrderItemRequest {
            product_id: ProductId::new(product),
            variant_id: variant.map(VariantId::new),
            quantity,
        }
    }

    const CHECKOUT: &str = r#"{
        "first_name": "Jana",
        "last_name": "Nováková",
        "email": "Jana@Example.CZ",
        "phone": "+420 777 123 456",
        "street": "Dlouhá 5",
        "city": "Praha",
        "zip": "110 00",
        "country": "CZ",
        "company": "  ",
        "payment_method": "bank_transfer",
        "delivery_method": "pickup_point"
    }"#;

    #[test]
    fn test_checkout_details_parse_and_validate() {
        let mut details: CheckoutDetails = serde_json::from_str(CHECKOUT).unwrap();
        details.validate().unwrap();

        assert_eq!(details.customer.email, "Jana@example.cz");
        assert_eq!(details.customer.company, None);
        assert_eq!(details.delivery_method, DeliveryMethod::PickupPoint);
        assert_eq!(details.payment_method, PaymentMethod::BankTransfer);
    }

    #[test]
    fn test_checkout_rejects_bad_email() {
        let json = CHECKOUT.replace("Jana@Example.CZ", "not-an-email");
        let mut details: CheckoutDetails = serde_json::from_str(&json).unwrap();
        let err = details.validate().unwrap_err();
        assert!(err.starts_with("email"));
    }

    #[test]
    fn test_partial_delivery_address_rejected() {
        let mut address = DeliveryAddress {
            delivery_street: Some("Krátká 1".to_string()),
            ..DeliveryAddress::default()
        };
        assert!(address.validate().is_err());

        let mut empty = DeliveryAddress {
            delivery_name: Some(" ".to_string()),
            ..DeliveryAddress::default()
        };
        assert!(empty.validate().is_ok());
        assert_eq!(empty.delivery_name, None);
    }

    #[test]
    fn test_normalize_items_merges_duplicates() {
        let merged =
            normalize_items(&[item(1, None, 2), item(1, Some(3), 1), item(1, None, 1)]).unwrap();
        assert_eq!(merged, vec![item(1, None, 3), item(1, Some(3), 1)]);
    }

    #[test]
    fn test_normalize_items_rejects_bad_input() {
        assert!(normalize_items(&[]).is_err());
        assert!(normalize_items(&[item(1, None, 0)]).is_err());
        assert!(normalize_items(&[item(1, None, 60), item(1, None, 60)]).is_err());
    }

    #[test]
    fn test_update_request_into_patch() {
        let req: UpdateOrderRequest =
            serde_json::from_str(r#"{"status": "shipped", "tracking_number": "DR123"}"#).unwrap();
        let patch = OrderPatch::from(req);
        assert_eq!(patch.status, Some(OrderStatus::Shipped));
        assert_eq!(patch.tracking_number.as_deref(), Some("DR123"));
        assert_eq!(patch.payment_status, None);
    }
}
