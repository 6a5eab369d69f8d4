//! Admin invoice routes.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use shoply_core::InvoiceId;
use tracing::{info, instrument, warn};

use crate::db::{InvoiceRepository, OrderRepository};
use crate::error::{AppError, Result};
use crate::models::{Invoice, Page, Pagination};
use crate::routes::orders::svg_response;
use crate::services::{invoice_pdf, invoices};
use crate::state::AppState;

async fn load(state: &AppState, id: InvoiceId) -> Result<Invoice> {
    InvoiceRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("invoice {id}")))
}

/// `GET /admin/api/invoices` - newest first.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<Invoice>>> {
    Ok(Json(
        InvoiceRepository::new(state.pool()).list(pagination).await?,
    ))
}

#[instrument(skip(state), fields(invoice_id = %id))]
pub async fn show(State(state): State<AppState>, Path(id): Path<InvoiceId>) -> Result<Json<Invoice>> {
    Ok(Json(load(&state, id).await?))
}

/// `DELETE /admin/api/invoices/{id}` - also removes the stored PDF.
#[instrument(skip(state), fields(invoice_id = %id))]
pub async fn delete(State(state): State<AppState>, Path(id): Path<InvoiceId>) -> Result<StatusCode> {
    let invoice = load(&state, id).await?;
    InvoiceRepository::new(state.pool()).delete(id).await?;

    if invoice.pdf_url.is_some() {
        let path = state
            .config()
            .upload_dir
            .join("invoices")
            .join(invoice_pdf::file_name(&invoice.invoice_number));
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove invoice PDF");
        }
    }

    info!(invoice = %invoice.invoice_number, "Invoice deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /admin/api/invoices/{id}/pdf` - render the PDF again.
#[instrument(skip(state), fields(invoice_id = %id))]
pub async fn regenerate_pdf(
    State(state): State<AppState>,
    Path(id): Path<InvoiceId>,
) -> Result<Json<Invoice>> {
    let invoice = invoices::regenerate_pdf(&state, id).await?;
    Ok(Json(invoice))
}

/// `GET /admin/api/invoices/{id}/qr` - payment QR for the invoiced order.
#[instrument(skip(state), fields(invoice_id = %id))]
pub async fn qr(State(state): State<AppState>, Path(id): Path<InvoiceId>) -> Result<Response> {
    let invoice = load(&state, id).await?;
    let order = OrderRepository::new(state.pool())
        .get(invoice.order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("order not found".to_string()))?;

    let payload = invoices::payment_payload(&state, &order).ok_or_else(|| {
        AppError::NotFound("no QR payment for this invoice".to_string())
    })?;
    svg_response(&payload)
}
