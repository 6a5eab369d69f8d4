//! Invoice issuing and PDF storage.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use shoply_core::invoice;
use shoply_core::{InvoiceId, OrderId};

use crate::db::{InvoiceRepository, OrderRepository, RepositoryError};
use crate::models::{Invoice, Order};
use crate::services::invoice_pdf::{self, PdfError};
use crate::services::payment_qr;
use crate::services::uploads::UPLOADS_PREFIX;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("order not found")]
    OrderNotFound,

    #[error(transparent)]
    Pdf(#[from] PdfError),
}

/// Public URL path of an invoice PDF.
#[must_use]
pub fn pdf_path(invoice_number: &str) -> String {
    format!(
        "{UPLOADS_PREFIX}/invoices/{}",
        invoice_pdf::file_name(invoice_number)
    )
}

/// Issue the invoice for an order, or return the existing one.
///
/// A PDF is rendered for new invoices and for existing ones without a PDF.
/// Rendering failures are logged and leave `pdf_url` empty.
///
/// # Errors
///
/// Returns `InvoiceError::OrderNotFound` if the order does not exist.
#[instrument(skip(state), fields(order_id = %order_id))]
pub async fn issue_for_order(
    state: &AppState,
    order_id: OrderId,
) -> Result<(Invoice, bool), InvoiceError> {
    let order = OrderRepository::new(state.pool())
        .get(order_id)
        .await?
        .ok_or(InvoiceError::OrderNotFound)?;

    let terms = invoice::terms(
        order.order_number,
        Utc::now().date_naive(),
        order.total,
        state.config().store.vat_rate,
    );
    let (invoice, created) = InvoiceRepository::new(state.pool())
        .create_or_get(order_id, &terms)
        .await?;

    if created {
        info!(invoice = %invoice.invoice_number, "Invoice issued");
    }
    if invoice.pdf_url.is_some() {
        return Ok((invoice, created));
    }

    match store_pdf(state, &invoice, &order).await {
        Ok(updated) => Ok((updated, created)),
        Err(e) => {
            warn!(invoice = %invoice.invoice_number, error = %e, "Invoice PDF generation failed");
            Ok((invoice, created))
        }
    }
}

/// Re-render an invoice's PDF.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the invoice does not exist, or
/// `InvoiceError::Pdf` if rendering fails.
#[instrument(skip(state), fields(invoice_id = %id))]
pub async fn regenerate_pdf(state: &AppState, id: InvoiceId) -> Result<Invoice, InvoiceError> {
    let invoice = InvoiceRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    let order = OrderRepository::new(state.pool())
        .get(invoice.order_id)
        .await?
        .ok_or(InvoiceError::OrderNotFound)?;

    store_pdf(state, &invoice, &order).await
}

/// SPD payload for an invoice's order, if it is payable by bank transfer.
#[must_use]
pub fn payment_payload(state: &AppState, order: &Order) -> Option<String> {
    payment_qr::descriptor_for(order, &state.config().store).map(|d| d.to_spd())
}

async fn store_pdf(
    state: &AppState,
    invoice: &Invoice,
    order: &Order,
) -> Result<Invoice, InvoiceError> {
    let config = state.config();
    let payload = payment_payload(state, order);

    invoice_pdf::write_invoice(
        &config.upload_dir,
        invoice,
        order,
        &config.store,
        payload.as_deref(),
    )
    .await?;

    let updated = InvoiceRepository::new(state.pool())
        .set_pdf_url(invoice.id, &pdf_path(&invoice.invoice_number))
        .await?;
    Ok(updated)
}
