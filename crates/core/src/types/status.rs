//! Status and method enums stored as `TEXT` columns.
//!
//! Each enum round-trips through [`as_str`](OrderStatus::as_str) and
//! [`FromStr`](std::str::FromStr) so repositories can bind plain strings and
//! flag unknown stored values as data corruption.

use serde::{Deserialize, Serialize};

/// Implements `as_str`, `Display` and `FromStr` for a text-backed enum.
macro_rules! text_enum {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The stored text representation.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", $label, ": {}"), s)),
                }
            }
        }
    };
}

/// Order fulfillment status.
///
/// ```text
/// pending ──> processing ──> shipped ──> delivered
///    │             │
///    └──────┬──────┘
///           v
///       cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

text_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// Whether an order may move from `self` to `next`.
    ///
    /// Staying in the same status is always allowed (no-op update).
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Pending | Self::Processing | Self::Shipped | Self::Cancelled)
                | (Self::Processing, Self::Processing | Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Shipped | Self::Delivered)
                | (Self::Delivered, Self::Delivered)
                | (Self::Cancelled, Self::Cancelled)
        )
    }

    /// Terminal statuses accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

/// Payment status, set by admins (no gateway integration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
    Failed,
}

text_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Paid => "paid",
    Refunded => "refunded",
    Failed => "failed",
});

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Bank transfer with a QR payment code on the confirmation and invoice.
    #[default]
    BankTransfer,
    CashOnDelivery,
}

text_enum!(PaymentMethod, "payment method", {
    BankTransfer => "bank_transfer",
    CashOnDelivery => "cash_on_delivery",
});

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    #[default]
    Courier,
    PickupPoint,
    PersonalPickup,
}

text_enum!(DeliveryMethod, "delivery method", {
    Courier => "courier",
    PickupPoint => "pickup_point",
    PersonalPickup => "personal_pickup",
});

impl DeliveryMethod {
    /// Personal pickup never carries a shipping fee.
    #[must_use]
    pub const fn is_free(self) -> bool {
        matches!(self, Self::PersonalPickup)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
    }

    #[test]
    fn test_cancel_only_from_early_states() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_no_backwards_transitions() {
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_same_status_is_allowed() {
        for status in OrderStatus::ALL {
            assert!(status.can_transition_to(*status));
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }

    #[test]
    fn test_text_round_trip_matches_serde() {
        for status in OrderStatus::ALL {
            let parsed: OrderStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, *status);
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        for method in PaymentMethod::ALL {
            let json = serde_json::to_string(method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.as_str()));
        }
    }

    #[test]
    fn test_unknown_text_is_rejected() {
        assert!("archived".parse::<OrderStatus>().is_err());
        assert!("paid_twice".parse::<PaymentStatus>().is_err());
    }
}
