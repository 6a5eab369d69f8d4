//! Transactional email: order confirmation and shipping notification.
//!
//! Uses SMTP via lettre for delivery with Askama text and HTML templates.
//! Callers treat every send as best-effort.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use shoply_core::Money;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::models::Order;

/// History `new_value` for a sent confirmation.
pub const KIND_ORDER_CONFIRMATION: &str = "order_confirmation";
/// History `new_value` for a sent shipping notification.
pub const KIND_SHIPPING_NOTIFICATION: &str = "shipping_notification";

/// Line as shown in the confirmation email.
pub struct EmailLine {
    pub name: String,
    pub quantity: i32,
    pub total: String,
}

/// Bank-transfer block of the confirmation email.
pub struct BankDetails {
    pub account: String,
    pub amount: String,
    pub variable_symbol: i64,
    pub qr_url: String,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    first_name: &'a str,
    order_number: i64,
    lines: &'a [EmailLine],
    subtotal: &'a str,
    shipping: &'a str,
    total: &'a str,
    bank: &'a Option<BankDetails>,
    shop_name: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    first_name: &'a str,
    order_number: i64,
    lines: &'a [EmailLine],
    subtotal: &'a str,
    shipping: &'a str,
    total: &'a str,
    bank: &'a Option<BankDetails>,
    shop_name: &'a str,
}

#[derive(Template)]
#[template(path = "email/shipping_notification.html")]
struct ShippingNotificationHtml<'a> {
    first_name: &'a str,
    order_number: i64,
    tracking_number: Option<&'a str>,
    shop_name: &'a str,
}

#[derive(Template)]
#[template(path = "email/shipping_notification.txt")]
struct ShippingNotificationText<'a> {
    first_name: &'a str,
    order_number: i64,
    tracking_number: Option<&'a str>,
    shop_name: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    shop_name: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, shop_name: &str) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            shop_name: shop_name.to_string(),
        })
    }

    /// Send the order confirmation to the customer.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to send or a template fails to render.
    pub async fn send_order_confirmation(
        &self,
        order: &Order,
        bank: Option<BankDetails>,
    ) -> Result<(), EmailError> {
        let lines = email_lines(order);
        let subtotal = Money::new(order.subtotal, order.currency).to_string();
        let shipping = Money::new(order.shipping_price, order.currency).to_string();
        let total = Money::new(order.total, order.currency).to_string();

        let html = OrderConfirmationHtml {
            first_name: &order.customer.first_name,
            order_number: order.order_number,
            lines: &lines,
            subtotal: &subtotal,
            shipping: &shipping,
            total: &total,
            bank: &bank,
            shop_name: &self.shop_name,
        }
        .render()?;
        let text = OrderConfirmationText {
            first_name: &order.customer.first_name,
            order_number: order.order_number,
            lines: &lines,
            subtotal: &subtotal,
            shipping: &shipping,
            total: &total,
            bank: &bank,
            shop_name: &self.shop_name,
        }
        .render()?;

        let subject = format!("{}: order #{} received", self.shop_name, order.order_number);
        self.send_multipart_email(&order.customer.email, &subject, &text, &html)
            .await
    }

    /// Tell the customer the order has shipped.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to send or a template fails to render.
    pub async fn send_shipping_notification(&self, order: &Order) -> Result<(), EmailError> {
        let tracking_number = order.tracking_number.as_deref();

        let html = ShippingNotificationHtml {
            first_name: &order.customer.first_name,
            order_number: order.order_number,
            tracking_number,
            shop_name: &self.shop_name,
        }
        .render()?;
        let text = ShippingNotificationText {
            first_name: &order.customer.first_name,
            order_number: order.order_number,
            tracking_number,
            shop_name: &self.shop_name,
        }
        .render()?;

        let subject = format!("{}: order #{} shipped", self.shop_name, order.order_number);
        self.send_multipart_email(&order.customer.email, &subject, &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }
}

fn email_lines(order: &Order) -> Vec<EmailLine> {
    order
        .items
        .iter()
        .map(|item| EmailLine {
            name: item
                .variant_name
                .as_ref()
                .map_or_else(|| item.name.clone(), |v| format!("{} ({v})", item.name)),
            quantity: item.quantity,
            total: Money::new(item.total, order.currency).to_string(),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shipping_text_includes_tracking_when_present() {
        let text = ShippingNotificationText {
            first_name: "Jana",
            order_number: 1001,
            tracking_number: Some("DR1234"),
            shop_name: "Shoply",
        }
        .render()
        .unwrap();
        assert!(text.contains("order #1001 has been shipped"));
        assert!(text.contains("Tracking number: DR1234"));

        let without = ShippingNotificationText {
            first_name: "Jana",
            order_number: 1001,
            tracking_number: None,
            shop_name: "Shoply",
        }
        .render()
        .unwrap();
        assert!(!without.contains("Tracking number"));
    }

    #[test]
    fn test_confirmation_text_lists_lines_and_bank_details() {
        let lines = vec![EmailLine {
            name: "Mug (blue)".to_string(),
            quantity: 2,
            total: "398.00 CZK".to_string(),
        }];
        let bank = Some(BankDetails {
            account: "CZ6508000000192000145399".to_string(),
            amount: "497.00 CZK".to_string(),
            variable_symbol: 1001,
            qr_url: "https://shop.example/api/orders/1001/payment-qr".to_string(),
        });

        let text = OrderConfirmationText {
            first_name: "Jana",
            order_number: 1001,
            lines: &lines,
            subtotal: "398.00 CZK",
            shipping: "99.00 CZK",
            total: "497.00 CZK",
            bank: &bank,
            shop_name: "Shoply",
        }
        .render()
        .unwrap();

        assert!(text.contains("2 x Mug (blue)  398.00 CZK"));
        assert!(text.contains("Variable symbol: 1001"));
        assert!(text.contains("Total: 497.00 CZK"));
    }
}
