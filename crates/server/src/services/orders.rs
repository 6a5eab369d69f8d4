//! Order lifecycle: placing orders and applying admin updates, each followed
//! by best-effort customer email.
//!
//! Email never decides the outcome of a request. A failed send is logged at
//! `warn`; a successful one appends a `notification` history entry.

use shoply_core::Money;
use shoply_core::order_flow::{self, OrderPatch};
use shoply_core::{OrderId, OrderStatus};
use tracing::{info, instrument, warn};

use crate::db::{OrderRepository, RepositoryError};
use crate::db::orders::OrderWriteError;
use crate::models::order::BulkStatusResult;
use crate::models::{CheckoutDetails, Order, OrderItemRequest, PlacedOrder};
use crate::services::email::{BankDetails, KIND_ORDER_CONFIRMATION, KIND_SHIPPING_NOTIFICATION};
use crate::services::payment_qr;
use crate::state::AppState;

/// Place an order and send the confirmation email.
///
/// `items` must already be merged and validated.
///
/// # Errors
///
/// Returns `OrderWriteError` if the order cannot be placed.
#[instrument(skip(state, details, items), fields(lines = items.len()))]
pub async fn place_order(
    state: &AppState,
    details: &CheckoutDetails,
    items: &[OrderItemRequest],
) -> Result<PlacedOrder, OrderWriteError> {
    let config = state.config();
    let order = OrderRepository::new(state.pool())
        .place(
            details,
            items,
            &config.store.shipping,
            config.store.currency,
        )
        .await?;

    info!(order_number = order.order_number, total = %order.total, "Order placed");

    let payment_qr_url = payment_qr::descriptor_for(&order, &config.store)
        .map(|_| config.public_url(&payment_qr::storefront_path(order.order_number)));

    send_confirmation(state, &order, payment_qr_url.clone()).await;

    Ok(PlacedOrder {
        id: order.id,
        order_number: order.order_number,
        subtotal: order.subtotal,
        shipping_price: order.shipping_price,
        total: order.total,
        currency: order.currency,
        payment_method: order.payment_method,
        payment_qr_url,
    })
}

async fn send_confirmation(state: &AppState, order: &Order, qr_url: Option<String>) {
    let Some(email) = state.email() else {
        return;
    };

    let bank = payment_qr::descriptor_for(order, &state.config().store)
        .zip(qr_url)
        .map(|(descriptor, qr_url)| BankDetails {
            account: descriptor.account,
            amount: Money::new(descriptor.amount, descriptor.currency).to_string(),
            variable_symbol: descriptor.variable_symbol,
            qr_url,
        });

    match email.send_order_confirmation(order, bank).await {
        Ok(()) => record_notification(state, order, KIND_ORDER_CONFIRMATION).await,
        Err(e) => warn!(
            order_number = order.order_number,
            error = %e,
            "Failed to send order confirmation"
        ),
    }
}

/// Apply an admin update and send the shipping notification when due.
///
/// # Errors
///
/// Returns `OrderWriteError` if the order is missing or the status change is
/// not allowed.
#[instrument(skip(state, patch), fields(order_id = %id))]
pub async fn apply_update(
    state: &AppState,
    id: OrderId,
    patch: &OrderPatch,
) -> Result<Order, OrderWriteError> {
    let (order, plan) = OrderRepository::new(state.pool()).update(id, patch).await?;

    if !plan.is_noop() {
        info!(
            order_number = order.order_number,
            changes = plan.history.len(),
            status = %order.status,
            "Order updated"
        );
    }
    if plan.notify_shipped {
        send_shipping_notification(state, &order).await;
    }

    Ok(order)
}

/// Set the status of several orders; each order succeeds or fails on its own.
#[instrument(skip(state, ids), fields(count = ids.len(), status = %status))]
pub async fn bulk_set_status(
    state: &AppState,
    ids: &[OrderId],
    status: OrderStatus,
) -> Vec<BulkStatusResult> {
    let patch = OrderPatch {
        status: Some(status),
        ..OrderPatch::default()
    };

    let mut results = Vec::with_capacity(ids.len());
    for &id in ids {
        let result = match apply_update(state, id, &patch).await {
            Ok(_) => BulkStatusResult {
                id,
                ok: true,
                error: None,
            },
            Err(e) => {
                let message = match &e {
                    OrderWriteError::Repository(RepositoryError::NotFound) => {
                        "order not found".to_string()
                    }
                    OrderWriteError::Repository(_) => {
                        warn!(order_id = %id, error = %e, "Bulk status update failed");
                        "update failed".to_string()
                    }
                    other => other.to_string(),
                };
                BulkStatusResult {
                    id,
                    ok: false,
                    error: Some(message),
                }
            }
        };
        results.push(result);
    }
    results
}

async fn send_shipping_notification(state: &AppState, order: &Order) {
    let Some(email) = state.email() else {
        return;
    };

    match email.send_shipping_notification(order).await {
        Ok(()) => record_notification(state, order, KIND_SHIPPING_NOTIFICATION).await,
        Err(e) => warn!(
            order_number = order.order_number,
            error = %e,
            "Failed to send shipping notification"
        ),
    }
}

async fn record_notification(state: &AppState, order: &Order, kind: &str) {
    let entry = order_flow::notification_entry(kind, &order.customer.email);
    if let Err(e) = OrderRepository::new(state.pool())
        .append_history(order.id, &entry)
        .await
    {
        warn!(order_number = order.order_number, error = %e, "Failed to record notification");
    }
}
