//! Invoice model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shoply_core::{InvoiceId, OrderId};

/// An invoice issued for one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub order_id: OrderId,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub total: Decimal,
    pub vat_base: Decimal,
    pub vat_amount: Decimal,
    pub vat_rate: Decimal,
    /// `None` when PDF rendering failed; retry via the PDF endpoint.
    pub pdf_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
