//! Admin order management.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use shoply_core::OrderId;
use shoply_core::order_flow::OrderPatch;
use tracing::{info, instrument};

use crate::db::{InvoiceRepository, OrderRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::order::{BulkStatusRequest, BulkStatusResult, OrderFilter};
use crate::models::{Invoice, Order, OrderDetail, Page, UpdateOrderRequest};
use crate::services::{invoices, orders};
use crate::state::AppState;

/// Most orders a single bulk status request may touch.
const MAX_BULK_ORDERS: usize = 200;

/// `GET /admin/api/orders?status=&page=&per_page=` - newest first.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Page<Order>>> {
    Ok(Json(OrderRepository::new(state.pool()).list(&filter).await?))
}

/// `GET /admin/api/orders/{id}` - order with its history and invoice.
#[instrument(skip(state), fields(order_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    let history = repo.history(id).await?;
    let invoice = InvoiceRepository::new(state.pool()).get_by_order(id).await?;

    Ok(Json(OrderDetail {
        order,
        history,
        invoice,
    }))
}

/// `PUT /admin/api/orders/{id}` - status, payment status, tracking and note.
#[instrument(skip(state, request), fields(order_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(request): Json<UpdateOrderRequest>,
) -> Result<Json<Order>> {
    let patch = OrderPatch::from(request);
    add_breadcrumb("admin", "Order updated", None);
    let order = orders::apply_update(&state, id, &patch).await?;
    Ok(Json(order))
}

/// `DELETE /admin/api/orders/{id}` - removes the order, its history and
/// invoice.
#[instrument(skip(state), fields(order_id = %id))]
pub async fn delete(State(state): State<AppState>, Path(id): Path<OrderId>) -> Result<StatusCode> {
    OrderRepository::new(state.pool()).delete(id).await?;
    info!(order_id = %id, "Order deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `PATCH /admin/api/orders/status` - set one status on many orders.
///
/// Each order succeeds or fails on its own; the response lists every
/// outcome.
#[instrument(skip(state, request), fields(count = request.ids.len(), status = %request.status))]
pub async fn bulk_status(
    State(state): State<AppState>,
    Json(request): Json<BulkStatusRequest>,
) -> Result<Json<Vec<BulkStatusResult>>> {
    let mut ids = request.ids;
    ids.sort_unstable();
    ids.dedup();

    if ids.is_empty() {
        return Err(AppError::BadRequest("ids must not be empty".to_string()));
    }
    if ids.len() > MAX_BULK_ORDERS {
        return Err(AppError::BadRequest(format!(
            "at most {MAX_BULK_ORDERS} orders per request"
        )));
    }

    let results = orders::bulk_set_status(&state, &ids, request.status).await;
    let failed = results.iter().filter(|r| !r.ok).count();
    info!(updated = results.len() - failed, failed, "Bulk status update finished");

    Ok(Json(results))
}

/// `POST /admin/api/orders/{id}/invoice` - 201 when issued now, 200 when it
/// already existed.
#[instrument(skip(state), fields(order_id = %id))]
pub async fn issue_invoice(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<(StatusCode, Json<Invoice>)> {
    let (invoice, created) = invoices::issue_for_order(&state, id).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(invoice)))
}
