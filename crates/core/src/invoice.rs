//! Invoice numbering, VAT and bank-transfer payment descriptors.

use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{CurrencyCode, round_money};

/// Prefix of every invoice number.
pub const INVOICE_PREFIX: &str = "FAK";

/// Days between issue and due date.
pub const PAYMENT_TERM_DAYS: u64 = 14;

/// Maximum length of the `MSG` field in a payment descriptor.
pub const SPD_MESSAGE_MAX: usize = 60;

/// `FAK<year><orderNumber>`, e.g. `FAK20241042`.
#[must_use]
pub fn invoice_number(issue_date: NaiveDate, order_number: i64) -> String {
    format!("{INVOICE_PREFIX}{}{order_number}", issue_date.year())
}

/// Issue date plus the payment term.
#[must_use]
pub fn due_date(issue_date: NaiveDate) -> NaiveDate {
    issue_date
        .checked_add_days(Days::new(PAYMENT_TERM_DAYS))
        .unwrap_or(NaiveDate::MAX)
}

/// VAT split of a VAT-inclusive total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VatBreakdown {
    /// Rate in percent, e.g. `21`.
    pub rate: Decimal,
    pub base: Decimal,
    pub vat: Decimal,
    pub total: Decimal,
}

impl VatBreakdown {
    /// Split `total` (VAT included) at `rate` percent.
    ///
    /// The base is rounded to cents and the VAT is the remainder, so
    /// `base + vat == total` always holds.
    #[must_use]
    pub fn from_gross(total: Decimal, rate: Decimal) -> Self {
        let total = round_money(total);
        let divisor = Decimal::ONE + rate / Decimal::ONE_HUNDRED;
        let base = if divisor.is_zero() {
            total
        } else {
            round_money(total / divisor)
        };
        Self {
            rate,
            base,
            vat: total - base,
            total,
        }
    }
}

/// Everything deterministic about an invoice for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceTerms {
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub vat: VatBreakdown,
}

/// Compute invoice terms for an order issued on `issue_date`.
#[must_use]
pub fn terms(
    order_number: i64,
    issue_date: NaiveDate,
    total: Decimal,
    vat_rate: Decimal,
) -> InvoiceTerms {
    InvoiceTerms {
        invoice_number: invoice_number(issue_date, order_number),
        issue_date,
        due_date: due_date(issue_date),
        vat: VatBreakdown::from_gross(total, vat_rate),
    }
}

/// Input for a Short Payment Descriptor (Czech QR payment) string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDescriptor {
    /// IBAN, spaces allowed.
    pub account: String,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    /// Variable symbol; the order number.
    pub variable_symbol: i64,
    pub message: String,
}

impl PaymentDescriptor {
    /// Render as `SPD*1.0*ACC:..*AM:..*CC:..*X-VS:..*MSG:..`.
    ///
    /// ```
    /// use rust_decimal::Decimal;
    /// use shoply_core::CurrencyCode;
    /// use shoply_core::invoice::PaymentDescriptor;
    ///
    /// let spd = PaymentDescriptor {
    ///     account: "CZ65 0800 0000 1920 0014 5399".to_owned(),
    ///     amount: Decimal::new(129_900, 2),
    ///     currency: CurrencyCode::CZK,
    ///     variable_symbol: 1042,
    ///     message: "Order 1042".to_owned(),
    /// }
    /// .to_spd();
    ///
    /// assert_eq!(
    ///     spd,
    ///     "SPD*1.0*ACC:CZ6508000000192000145399*AM:1299.00*CC:CZK*X-VS:1042*MSG:Order 1042"
    /// );
    /// ```
    #[must_use]
    pub fn to_spd(&self) -> String {
        let account: String = self
            .account
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();
        let message: String = self
            .message
            .chars()
            .take(SPD_MESSAGE_MAX)
            .collect::<String>()
            .replace('*', "%2A");

        format!(
            "SPD*1.0*ACC:{account}*AM:{:.2}*CC:{}*X-VS:{}*MSG:{message}",
            round_money(self.amount),
            self.currency.code(),
            self.variable_symbol,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_invoice_number_uses_issue_year() {
        assert_eq!(invoice_number(date(2024, 12, 31), 1042), "FAK20241042");
        assert_eq!(invoice_number(date(2025, 1, 1), 7), "FAK20257");
    }

    #[test]
    fn test_due_date_crosses_month() {
        assert_eq!(due_date(date(2024, 2, 20)), date(2024, 3, 5));
    }

    #[test]
    fn test_vat_at_21_percent() {
        let vat = VatBreakdown::from_gross(Decimal::new(1210, 0), Decimal::new(21, 0));
        assert_eq!(vat.base, Decimal::new(1000, 0));
        assert_eq!(vat.vat, Decimal::new(210, 0));
    }

    #[test]
    fn test_vat_parts_always_sum_to_total() {
        for cents in [1_i64, 99, 12_345, 99_999, 123_457] {
            let total = Decimal::new(cents, 2);
            let vat = VatBreakdown::from_gross(total, Decimal::new(21, 0));
            assert_eq!(vat.base + vat.vat, total);
            assert!(vat.vat >= Decimal::ZERO);
        }
    }

    #[test]
    fn test_zero_rate() {
        let vat = VatBreakdown::from_gross(Decimal::new(500, 0), Decimal::ZERO);
        assert_eq!(vat.base, Decimal::new(500, 0));
        assert_eq!(vat.vat, Decimal::ZERO);
    }

    #[test]
    fn test_terms() {
        let t = terms(15, date(2024, 6, 1), Decimal::new(121, 0), Decimal::new(21, 0));
        assert_eq!(t.invoice_number, "FAK202415");
        assert_eq!(t.due_date, date(2024, 6, 15));
        assert_eq!(t.vat.base, Decimal::new(100, 0));
    }

    #[test]
    fn test_spd_escapes_and_truncates_message() {
        let spd = PaymentDescriptor {
            account: "cz65 0800".to_owned(),
            amount: Decimal::new(5, 1),
            currency: CurrencyCode::EUR,
            variable_symbol: 9,
            message: format!("a*b{}", "x".repeat(100)),
        }
        .to_spd();

        assert!(spd.starts_with("SPD*1.0*ACC:CZ650800*AM:0.50*CC:EUR*X-VS:9*MSG:a%2Ab"));
        let msg = spd.split("MSG:").nth(1).unwrap();
        assert_eq!(msg.len(), SPD_MESSAGE_MAX + 2);
    }
}
