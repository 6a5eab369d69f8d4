//! Bank-transfer QR codes (Short Payment Descriptor rendered as SVG).

use qrcode::QrCode;
use qrcode::render::svg;
use qrcode::types::QrError;

use shoply_core::PaymentMethod;
use shoply_core::invoice::PaymentDescriptor;

use crate::config::StoreConfig;
use crate::models::Order;

/// Minimum rendered edge in pixels.
const QR_MIN_SIZE: u32 = 240;

/// Payment descriptor for an order, or `None` when the order is not paid by
/// bank transfer or no bank account is configured.
#[must_use]
pub fn descriptor_for(order: &Order, store: &StoreConfig) -> Option<PaymentDescriptor> {
    if order.payment_method != PaymentMethod::BankTransfer {
        return None;
    }
    let account = store.bank_account.as_deref()?;

    Some(PaymentDescriptor {
        account: account.to_string(),
        amount: order.total,
        currency: order.currency,
        variable_symbol: order.order_number,
        message: format!("{} {}", store.name, order.order_number),
    })
}

/// Public path of an order's QR code.
#[must_use]
pub fn storefront_path(order_number: i64) -> String {
    format!("/api/orders/{order_number}/payment-qr")
}

/// Render a payload as a standalone SVG document.
///
/// # Errors
///
/// Returns `QrError` if the payload does not fit in a QR code.
pub fn render_svg(payload: &str) -> Result<String, QrError> {
    let code = QrCode::new(payload.as_bytes())?;
    Ok(code
        .render::<svg::Color<'_>>()
        .min_dimensions(QR_MIN_SIZE, QR_MIN_SIZE)
        .quiet_zone(true)
        .build())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use shoply_core::CurrencyCode;

    use super::*;

    #[test]
    fn test_render_svg_produces_svg_document() {
        let spd = PaymentDescriptor {
            account: "CZ65 0800 0000 1920 0014 5399".to_string(),
            amount: Decimal::new(49_900, 2),
            currency: CurrencyCode::CZK,
            variable_symbol: 1001,
            message: "Shoply 1001".to_string(),
        }
        .to_spd();

        let svg = render_svg(&spd).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_storefront_path() {
        assert_eq!(storefront_path(1042), "/api/orders/1042/payment-qr");
    }
}
