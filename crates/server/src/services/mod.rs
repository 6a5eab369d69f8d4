//! Services sitting between routes and repositories.
//!
//! - [`orders`] - Placing and updating orders, with best-effort email
//! - [`invoices`] - Issuing invoices and storing their PDFs
//! - [`invoice_pdf`] - Invoice page layout and rendering
//! - [`payment_qr`] - Bank-transfer QR codes
//! - [`email`] - SMTP delivery of order emails
//! - [`category_tree`] - Cached storefront category tree
//! - [`uploads`] - Image upload validation and storage

pub mod category_tree;
pub mod email;
pub mod invoice_pdf;
pub mod invoices;
pub mod orders;
pub mod payment_qr;
pub mod uploads;
