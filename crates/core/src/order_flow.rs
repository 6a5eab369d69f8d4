//! Order status transitions and the history entries they produce.
//!
//! [`plan_order_update`] compares the stored order with an admin's patch and
//! returns everything the caller must write: the next field values, one
//! history entry per changed field, and whether a shipping notification is
//! due. The caller persists the plan in one transaction and only then sends
//! email.

use serde::Serialize;

use crate::types::{OrderStatus, PaymentStatus};

/// History field names.
pub mod fields {
    pub const STATUS: &str = "status";
    pub const PAYMENT_STATUS: &str = "payment_status";
    pub const TRACKING_NUMBER: &str = "tracking_number";
    pub const NOTE: &str = "note";
    pub const NOTIFICATION: &str = "notification";
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderFlowError {
    #[error("cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order is {0} and its status can no longer change")]
    Closed(OrderStatus),
}

/// The mutable part of a stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSnapshot {
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub tracking_number: Option<String>,
    pub note: Option<String>,
}

/// An admin update. `None` leaves a field untouched; an empty or
/// whitespace-only string clears an optional text field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub tracking_number: Option<String>,
    pub note: Option<String>,
}

/// One append-only history row to write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub field: Option<&'static str>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub message: String,
}

/// Result of [`plan_order_update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderChangePlan {
    pub next: OrderSnapshot,
    pub history: Vec<HistoryEntry>,
    pub notify_shipped: bool,
}

impl OrderChangePlan {
    /// Whether anything needs to be written.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.history.is_empty()
    }
}

/// Plan an admin update of an order.
///
/// # Errors
///
/// Returns [`OrderFlowError::Closed`] if the order is delivered or cancelled
/// and the patch asks for another status, and
/// [`OrderFlowError::InvalidTransition`] if the requested status is not
/// reachable from the current one.
pub fn plan_order_update(
    current: &OrderSnapshot,
    patch: &OrderPatch,
) -> Result<OrderChangePlan, OrderFlowError> {
    let mut next = current.clone();
    let mut history = Vec::new();

    if let Some(status) = patch.status {
        if current.status.is_terminal() && status != current.status {
            return Err(OrderFlowError::Closed(current.status));
        }
        if !current.status.can_transition_to(status) {
            return Err(OrderFlowError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }
        if status != current.status {
            history.push(HistoryEntry {
                field: Some(fields::STATUS),
                old_value: Some(current.status.to_string()),
                new_value: Some(status.to_string()),
                message: format!("Status changed from {} to {status}", current.status),
            });
            next.status = status;
        }
    }

    if let Some(payment) = patch.payment_status
        && payment != current.payment_status
    {
        history.push(HistoryEntry {
            field: Some(fields::PAYMENT_STATUS),
            old_value: Some(current.payment_status.to_string()),
            new_value: Some(payment.to_string()),
            message: format!(
                "Payment status changed from {} to {payment}",
                current.payment_status
            ),
        });
        next.payment_status = payment;
    }

    let mut tracking_changed = false;
    if let Some(raw) = &patch.tracking_number {
        let tracking = normalize_text(raw);
        if tracking != current.tracking_number {
            let message = tracking.as_ref().map_or_else(
                || "Tracking number removed".to_owned(),
                |t| format!("Tracking number set to {t}"),
            );
            history.push(HistoryEntry {
                field: Some(fields::TRACKING_NUMBER),
                old_value: current.tracking_number.clone(),
                new_value: tracking.clone(),
                message,
            });
            tracking_changed = tracking.is_some();
            next.tracking_number = tracking;
        }
    }

    if let Some(raw) = &patch.note {
        let note = normalize_text(raw);
        if note != current.note {
            history.push(HistoryEntry {
                field: Some(fields::NOTE),
                old_value: current.note.clone(),
                new_value: note.clone(),
                message: "Note updated".to_owned(),
            });
            next.note = note;
        }
    }

    let became_shipped =
        next.status == OrderStatus::Shipped && current.status != OrderStatus::Shipped;
    let tracking_while_shipped = next.status == OrderStatus::Shipped
        && current.status == OrderStatus::Shipped
        && tracking_changed;

    Ok(OrderChangePlan {
        next,
        history,
        notify_shipped: became_shipped || tracking_while_shipped,
    })
}

/// The history entry written when an order is placed.
#[must_use]
pub fn created_entry(order_number: i64) -> HistoryEntry {
    HistoryEntry {
        field: None,
        old_value: None,
        new_value: Some(OrderStatus::Pending.to_string()),
        message: format!("Order {order_number} created"),
    }
}

/// The history entry written after a notification email was sent.
#[must_use]
pub fn notification_entry(kind: &str, recipient: &str) -> HistoryEntry {
    HistoryEntry {
        field: Some(fields::NOTIFICATION),
        old_value: None,
        new_value: Some(kind.to_owned()),
        message: format!("Sent {kind} email to {recipient}"),
    }
}

fn normalize_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order(status: OrderStatus, tracking: Option<&str>) -> OrderSnapshot {
        OrderSnapshot {
            status,
            payment_status: PaymentStatus::Pending,
            tracking_number: tracking.map(str::to_owned),
            note: None,
        }
    }

    fn fields_of(plan: &OrderChangePlan) -> Vec<&'static str> {
        plan.history.iter().filter_map(|h| h.field).collect()
    }

    #[test]
    fn test_status_change_writes_one_entry() {
        let plan = plan_order_update(
            &order(OrderStatus::Pending, None),
            &OrderPatch {
                status: Some(OrderStatus::Processing),
                ..OrderPatch::default()
            },
        )
        .unwrap();

        assert_eq!(plan.next.status, OrderStatus::Processing);
        assert_eq!(fields_of(&plan), vec!["status"]);
        assert_eq!(plan.history[0].old_value.as_deref(), Some("pending"));
        assert_eq!(plan.history[0].new_value.as_deref(), Some("processing"));
        assert!(!plan.notify_shipped);
    }

    #[test]
    fn test_shipping_with_tracking_notifies_once() {
        let plan = plan_order_update(
            &order(OrderStatus::Processing, None),
            &OrderPatch {
                status: Some(OrderStatus::Shipped),
                tracking_number: Some("DR1234567890".to_owned()),
                ..OrderPatch::default()
            },
        )
        .unwrap();

        assert!(plan.notify_shipped);
        assert_eq!(fields_of(&plan), vec!["status", "tracking_number"]);
    }

    #[test]
    fn test_tracking_change_while_shipped_notifies() {
        let plan = plan_order_update(
            &order(OrderStatus::Shipped, Some("OLD1")),
            &OrderPatch {
                tracking_number: Some("NEW2".to_owned()),
                ..OrderPatch::default()
            },
        )
        .unwrap();

        assert!(plan.notify_shipped);
        assert_eq!(plan.next.tracking_number.as_deref(), Some("NEW2"));
    }

    #[test]
    fn test_same_tracking_while_shipped_is_noop() {
        let plan = plan_order_update(
            &order(OrderStatus::Shipped, Some("ABC")),
            &OrderPatch {
                status: Some(OrderStatus::Shipped),
                tracking_number: Some(" ABC ".to_owned()),
                ..OrderPatch::default()
            },
        )
        .unwrap();

        assert!(plan.is_noop());
        assert!(!plan.notify_shipped);
    }

    #[test]
    fn test_tracking_before_shipping_does_not_notify() {
        let plan = plan_order_update(
            &order(OrderStatus::Processing, None),
            &OrderPatch {
                tracking_number: Some("XYZ".to_owned()),
                ..OrderPatch::default()
            },
        )
        .unwrap();

        assert!(!plan.notify_shipped);
        assert_eq!(fields_of(&plan), vec!["tracking_number"]);
    }

    #[test]
    fn test_clearing_tracking_does_not_notify() {
        let plan = plan_order_update(
            &order(OrderStatus::Shipped, Some("ABC")),
            &OrderPatch {
                tracking_number: Some(String::new()),
                ..OrderPatch::default()
            },
        )
        .unwrap();

        assert!(!plan.notify_shipped);
        assert_eq!(plan.next.tracking_number, None);
        assert_eq!(plan.history[0].message, "Tracking number removed");
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let err = plan_order_update(
            &order(OrderStatus::Shipped, None),
            &OrderPatch {
                status: Some(OrderStatus::Pending),
                ..OrderPatch::default()
            },
        )
        .unwrap_err();

        assert_eq!(
            err,
            OrderFlowError::InvalidTransition {
                from: OrderStatus::Shipped,
                to: OrderStatus::Pending,
            }
        );
    }

    #[test]
    fn test_closed_order_keeps_status() {
        let closed = order(OrderStatus::Delivered, None);
        let err = plan_order_update(
            &closed,
            &OrderPatch {
                status: Some(OrderStatus::Pending),
                ..OrderPatch::default()
            },
        )
        .unwrap_err();
        assert_eq!(err, OrderFlowError::Closed(OrderStatus::Delivered));
        assert_eq!(
            err.to_string(),
            "order is delivered and its status can no longer change"
        );

        // Same status plus a note is still allowed
        let plan = plan_order_update(
            &closed,
            &OrderPatch {
                status: Some(OrderStatus::Delivered),
                note: Some("Left with neighbour".to_string()),
                ..OrderPatch::default()
            },
        )
        .unwrap();
        assert_eq!(plan.history.len(), 1);
    }

    #[test]
    fn test_every_changed_field_is_logged() {
        let plan = plan_order_update(
            &order(OrderStatus::Pending, None),
            &OrderPatch {
                status: Some(OrderStatus::Cancelled),
                payment_status: Some(PaymentStatus::Refunded),
                tracking_number: None,
                note: Some("Customer called".to_owned()),
            },
        )
        .unwrap();

        assert_eq!(fields_of(&plan), vec!["status", "payment_status", "note"]);
        assert!(!plan.notify_shipped);
    }

    #[test]
    fn test_created_and_notification_entries() {
        let created = created_entry(1042);
        assert_eq!(created.field, None);
        assert_eq!(created.message, "Order 1042 created");

        let sent = notification_entry("shipping", "jana@shop.cz");
        assert_eq!(sent.field, Some("notification"));
        assert_eq!(sent.new_value.as_deref(), Some("shipping"));
    }
}
