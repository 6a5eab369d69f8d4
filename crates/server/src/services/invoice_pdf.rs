//! PDF invoices.
//!
//! The document is laid out as a list of positioned text runs first
//! ([`layout`]), then drawn with printpdf's built-in Helvetica. Built-in
//! fonts only cover Latin-1, so every run is transliterated to ASCII.
//! Long orders continue on further A4 pages; the totals and payment
//! blocks are never split across a page break.

use std::path::{Path, PathBuf};

use printpdf::{BuiltinFont, Mm, PdfDocument};
use shoply_core::Money;
use thiserror::Error;

use crate::config::StoreConfig;
use crate::models::{Invoice, Order};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const TOP_MM: f32 = PAGE_HEIGHT_MM - 25.0;
/// Lowest baseline for body text; the footer sits below it.
const BOTTOM_MM: f32 = 25.0;
const FOOTER_MM: f32 = 15.0;
const LEFT_MM: f32 = 20.0;
const RIGHT_COLUMN_MM: f32 = 115.0;
const LINE_HEIGHT_MM: f32 = 5.5;
const TOTALS_HEIGHT_MM: f32 = 6.0 + 3.0 * LINE_HEIGHT_MM + 1.0;
const PAYMENT_HEIGHT_MM: f32 = 14.0 + 4.0 * LINE_HEIGHT_MM;
/// Longest item name printed before truncation.
const MAX_ITEM_NAME: usize = 60;

/// Errors that can occur while producing an invoice PDF.
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF rendering failed: {0}")]
    Render(#[from] printpdf::Error),

    #[error("failed to write invoice file: {0}")]
    Io(#[from] std::io::Error),
}

/// One positioned text run. `page` is zero-based.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub page: usize,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub bold: bool,
    pub text: String,
}

struct Cursor {
    runs: Vec<TextRun>,
    page: usize,
}

impl Cursor {
    fn text(&mut self, x: f32, y: f32, size: f32, bold: bool, text: impl AsRef<str>) {
        self.runs.push(TextRun {
            page: self.page,
            x,
            y,
            size,
            bold,
            text: deunicode::deunicode(text.as_ref()),
        });
    }

    /// Start a new page when `height` no longer fits below `y`.
    ///
    /// Returns the baseline to continue from.
    fn reserve(&mut self, y: f32, height: f32, invoice_number: &str) -> f32 {
        if y - height >= BOTTOM_MM {
            return y;
        }
        self.page += 1;
        self.text(
            LEFT_MM,
            TOP_MM,
            12.0,
            true,
            format!("Invoice {invoice_number} (continued)"),
        );
        TOP_MM - 10.0
    }

    fn table_header(&mut self, y: f32) -> f32 {
        self.text(LEFT_MM, y, 10.0, true, "Item");
        self.text(120.0, y, 10.0, true, "Qty");
        self.text(140.0, y, 10.0, true, "Unit price");
        self.text(170.0, y, 10.0, true, "Total");
        y - (LINE_HEIGHT_MM + 1.0)
    }
}

/// Lay out the invoice pages.
///
/// `payment_payload` is the QR payment string printed under the payment
/// details for bank-transfer orders.
#[must_use]
pub fn layout(
    invoice: &Invoice,
    order: &Order,
    store: &StoreConfig,
    payment_payload: Option<&str>,
) -> Vec<TextRun> {
    let number = invoice.invoice_number.as_str();
    let mut page = Cursor {
        runs: Vec::new(),
        page: 0,
    };
    let money = |amount| Money::new(amount, order.currency).to_string();

    let mut y = TOP_MM;
    page.text(LEFT_MM, y, 18.0, true, format!("Invoice {number}"));
    y -= 10.0;
    page.text(LEFT_MM, y, 10.0, false, format!("Issue date: {}", invoice.issue_date));
    page.text(RIGHT_COLUMN_MM, y, 10.0, false, format!("Due date: {}", invoice.due_date));
    y -= LINE_HEIGHT_MM;
    page.text(LEFT_MM, y, 10.0, false, format!("Order: {}", order.order_number));
    page.text(
        RIGHT_COLUMN_MM,
        y,
        10.0,
        false,
        format!("Variable symbol: {}", order.order_number),
    );

    // Seller and buyer blocks side by side.
    y -= 12.0;
    page.text(LEFT_MM, y, 11.0, true, "Seller");
    page.text(RIGHT_COLUMN_MM, y, 11.0, true, "Buyer");

    let seller = &store.seller;
    let mut seller_lines = vec![seller.name.clone(), seller.address.clone()];
    if let Some(id) = &seller.company_id {
        seller_lines.push(format!("Company ID: {id}"));
    }
    if let Some(vat) = &seller.vat_id {
        seller_lines.push(format!("VAT ID: {vat}"));
    }

    let customer = &order.customer;
    let mut buyer_lines = Vec::new();
    if let Some(company) = &customer.company {
        buyer_lines.push(company.clone());
    }
    buyer_lines.push(format!("{} {}", customer.first_name, customer.last_name));
    buyer_lines.push(customer.street.clone());
    buyer_lines.push(format!("{} {}", customer.zip, customer.city));
    buyer_lines.push(customer.country.clone());
    if let Some(id) = &customer.company_id {
        buyer_lines.push(format!("Company ID: {id}"));
    }
    if let Some(vat) = &customer.vat_id {
        buyer_lines.push(format!("VAT ID: {vat}"));
    }

    let block_top = y - LINE_HEIGHT_MM;
    let mut seller_y = block_top;
    for line in seller_lines.iter().filter(|l| !l.is_empty()) {
        page.text(LEFT_MM, seller_y, 10.0, false, line);
        seller_y -= LINE_HEIGHT_MM;
    }
    let mut buyer_y = block_top;
    for line in &buyer_lines {
        page.text(RIGHT_COLUMN_MM, buyer_y, 10.0, false, line);
        buyer_y -= LINE_HEIGHT_MM;
    }
    y = page.table_header(seller_y.min(buyer_y) - 8.0);

    for item in &order.items {
        let before = page.page;
        y = page.reserve(y, LINE_HEIGHT_MM, number);
        if page.page != before {
            y = page.table_header(y);
        }

        let mut name = item
            .variant_name
            .as_ref()
            .map_or_else(|| item.name.clone(), |v| format!("{} ({v})", item.name));
        if name.chars().count() > MAX_ITEM_NAME {
            name = name.chars().take(MAX_ITEM_NAME).collect::<String>() + "...";
        }
        page.text(LEFT_MM, y, 9.0, false, name);
        page.text(120.0, y, 9.0, false, item.quantity.to_string());
        page.text(140.0, y, 9.0, false, money(item.unit_price));
        page.text(170.0, y, 9.0, false, money(item.total));
        y -= LINE_HEIGHT_MM;
    }
    if !order.shipping_price.is_zero() {
        y = page.reserve(y, LINE_HEIGHT_MM, number);
        page.text(LEFT_MM, y, 9.0, false, "Shipping");
        page.text(170.0, y, 9.0, false, money(order.shipping_price));
        y -= LINE_HEIGHT_MM;
    }

    // Totals.
    y = page.reserve(y, TOTALS_HEIGHT_MM, number);
    y -= 6.0;
    page.text(
        RIGHT_COLUMN_MM,
        y,
        10.0,
        false,
        format!("Base excl. VAT: {}", money(invoice.vat_base)),
    );
    y -= LINE_HEIGHT_MM;
    page.text(
        RIGHT_COLUMN_MM,
        y,
        10.0,
        false,
        format!("VAT {}%: {}", invoice.vat_rate.normalize(), money(invoice.vat_amount)),
    );
    y -= LINE_HEIGHT_MM + 1.0;
    page.text(
        RIGHT_COLUMN_MM,
        y,
        12.0,
        true,
        format!("Total due: {}", money(invoice.total)),
    );

    // Payment details.
    y = page.reserve(y, PAYMENT_HEIGHT_MM, number);
    y -= 14.0;
    page.text(LEFT_MM, y, 11.0, true, "Payment");
    y -= LINE_HEIGHT_MM;
    let method = match order.payment_method {
        shoply_core::PaymentMethod::BankTransfer => "Bank transfer",
        shoply_core::PaymentMethod::CashOnDelivery => "Cash on delivery",
    };
    page.text(LEFT_MM, y, 10.0, false, format!("Method: {method}"));
    if let Some(account) = &store.bank_account {
        y -= LINE_HEIGHT_MM;
        page.text(LEFT_MM, y, 10.0, false, format!("Account: {account}"));
    }
    if let Some(payload) = payment_payload {
        y -= LINE_HEIGHT_MM;
        page.text(LEFT_MM, y, 7.0, false, format!("QR payment: {payload}"));
    }

    let pages = page.page + 1;
    for index in 0..pages {
        page.page = index;
        page.text(LEFT_MM, FOOTER_MM, 8.0, false, &store.name);
        if pages > 1 {
            page.text(
                170.0,
                FOOTER_MM,
                8.0,
                false,
                format!("Page {} of {pages}", index + 1),
            );
        }
    }
    page.runs
}

/// Draw the laid-out runs into a PDF document, one A4 page per run page.
///
/// # Errors
///
/// Returns `PdfError::Render` if printpdf fails.
pub fn render(title: &str, runs: &[TextRun]) -> Result<Vec<u8>, PdfError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "invoice");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    let page_count = runs.iter().map(|r| r.page + 1).max().unwrap_or(1);
    let mut layers = vec![doc.get_page(first_page).get_layer(first_layer)];
    for _ in 1..page_count {
        let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "invoice");
        layers.push(doc.get_page(page).get_layer(layer));
    }

    for run in runs {
        let Some(layer) = layers.get(run.page) else {
            continue;
        };
        let font = if run.bold { &bold } else { &regular };
        layer.use_text(run.text.as_str(), run.size, Mm(run.x), Mm(run.y), font);
    }

    Ok(doc.save_to_bytes()?)
}

/// File name for an invoice PDF.
#[must_use]
pub fn file_name(invoice_number: &str) -> String {
    format!("{invoice_number}.pdf")
}

/// Render the invoice and write it to `<upload_dir>/invoices/`.
///
/// Returns the written path.
///
/// # Errors
///
/// Returns `PdfError` if rendering or writing fails.
pub async fn write_invoice(
    upload_dir: &Path,
    invoice: &Invoice,
    order: &Order,
    store: &StoreConfig,
    payment_payload: Option<&str>,
) -> Result<PathBuf, PdfError> {
    let runs = layout(invoice, order, store, payment_payload);
    let bytes = render(&invoice.invoice_number, &runs)?;

    let dir = upload_dir.join("invoices");
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(file_name(&invoice.invoice_number));
    tokio::fs::write(&path, bytes).await?;

    tracing::info!(invoice = %invoice.invoice_number, path = %path.display(), "Invoice PDF written");
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use shoply_core::{
        CurrencyCode, DeliveryMethod, InvoiceId, OrderId, OrderStatus, PaymentMethod,
        PaymentStatus, ProductId,
    };

    use super::*;
    use crate::config::tests::test_config;
    use crate::models::OrderItem;
    use crate::models::order::{CustomerDetails, DeliveryAddress};

    pub(crate) fn sample_order() -> Order {
        Order {
            id: OrderId::new(7),
            order_number: 1042,
            customer: CustomerDetails {
                first_name: "Jana".to_string(),
                last_name: "Nováková".to_string(),
                email: "jana@example.cz".to_string(),
                phone: "+420777123456".to_string(),
                street: "Dlouhá 5".to_string(),
                city: "Praha".to_string(),
                zip: "11000".to_string(),
                country: "CZ".to_string(),
                company: None,
                company_id: None,
                vat_id: None,
            },
            delivery: DeliveryAddress::default(),
            delivery_method: DeliveryMethod::Courier,
            payment_method: PaymentMethod::BankTransfer,
            items: vec![OrderItem {
                product_id: ProductId::new(1),
                variant_id: None,
                name: "Hrnek žlutý".to_string(),
                variant_name: None,
                sku: None,
                unit_price: Decimal::new(600, 0),
                quantity: 2,
                total: Decimal::new(1200, 0),
            }],
            subtotal: Decimal::new(1200, 0),
            shipping_price: Decimal::new(99, 0),
            total: Decimal::new(1299, 0),
            currency: CurrencyCode::CZK,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            tracking_number: None,
            note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_invoice() -> Invoice {
        Invoice {
            id: InvoiceId::new(1),
            order_id: OrderId::new(7),
            invoice_number: "FAK20251042".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            total: Decimal::new(1299, 0),
            vat_base: Decimal::new(107_355, 2),
            vat_amount: Decimal::new(22_545, 2),
            vat_rate: Decimal::new(21, 0),
            pdf_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_layout_contains_key_fields_in_ascii() {
        let config = test_config();
        let runs = layout(&sample_invoice(), &sample_order(), &config.store, Some("SPD*1.0"));
        let texts: Vec<&str> = runs.iter().map(|r| r.text.as_str()).collect();

        assert!(texts.contains(&"Invoice FAK20251042"));
        assert!(texts.contains(&"Due date: 2025-03-15"));
        assert!(texts.contains(&"Jana Novakova"));
        assert!(texts.contains(&"Hrnek zluty"));
        assert!(texts.contains(&"Total due: 1299.00 CZK"));
        assert!(texts.contains(&"QR payment: SPD*1.0"));
        assert!(runs.iter().all(|r| r.text.is_ascii()));
    }

    #[test]
    fn test_layout_stays_on_page() {
        let config = test_config();
        let runs = layout(&sample_invoice(), &sample_order(), &config.store, None);
        assert!(runs.iter().all(|r| r.page == 0 && r.y > 0.0 && r.y < PAGE_HEIGHT_MM));
        assert!(!runs.iter().any(|r| r.text.starts_with("QR payment")));
        assert!(!runs.iter().any(|r| r.text.starts_with("Page ")));
    }

    fn long_order(lines: usize) -> Order {
        let mut order = sample_order();
        let template = order.items.first().cloned().unwrap();
        order.items = (1..=lines)
            .map(|n| OrderItem {
                name: format!("Talíř {n}"),
                ..template.clone()
            })
            .collect();
        order
    }

    #[test]
    fn test_long_order_continues_on_next_pages() {
        let config = test_config();
        let order = long_order(100);
        let runs = layout(&sample_invoice(), &order, &config.store, Some("SPD*1.0"));

        assert!(
            runs.iter()
                .all(|r| r.y >= FOOTER_MM && r.y < PAGE_HEIGHT_MM)
        );
        for n in 1..=100 {
            let name = format!("Talir {n}");
            assert_eq!(runs.iter().filter(|r| r.text == name).count(), 1, "{name}");
        }

        let pages = runs.iter().map(|r| r.page).max().unwrap() + 1;
        assert!(pages > 1);

        let total = runs
            .iter()
            .find(|r| r.text == "Total due: 1299.00 CZK")
            .unwrap();
        let payment = runs.iter().find(|r| r.text == "Payment").unwrap();
        assert!(total.y >= BOTTOM_MM);
        assert!(payment.page >= total.page);
        assert!(runs.iter().any(|r| r.text == format!("Page {pages} of {pages}")));
        assert_eq!(
            runs.iter()
                .filter(|r| r.text == "Invoice FAK20251042 (continued)")
                .count(),
            pages - 1
        );

        let bytes = render("FAK20251042", &runs).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_produces_pdf_bytes() {
        let config = test_config();
        let runs = layout(&sample_invoice(), &sample_order(), &config.store, None);
        let bytes = render("FAK20251042", &runs).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
