//! Currency normalization against a fixed USD rate table.

use crate::models::Invoice;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;

pub const BASE_CURRENCY: &str = "USD";

/// Units of USD per one unit of `code`. Unknown codes are treated as USD.
pub fn rate(code: &str) -> Decimal {
    match normalize(code) {
        "USD" => Decimal::ONE,
        "EUR" => Decimal::new(109, 2),
        "GBP" => Decimal::new(127, 2),
        "INR" => Decimal::new(12, 3),
        "CAD" => Decimal::new(74, 2),
        "AUD" => Decimal::new(66, 2),
        _ => Decimal::ONE,
    }
}

/// Missing currency codes mean USD.
pub fn normalize(code: &str) -> &str {
    let code = code.trim();
    if code.is_empty() { BASE_CURRENCY } else { code }
}

pub fn to_base(amount: Decimal, code: &str) -> Decimal {
    amount * rate(code)
}

pub fn from_base(amount: Decimal, code: &str) -> Decimal {
    amount / rate(code)
}

pub fn total_in_base<'a, I>(invoices: I) -> Decimal
where
    I: IntoIterator<Item = &'a Invoice>,
{
    invoices
        .into_iter()
        .map(|inv| to_base(inv.amount, &inv.currency_type))
        .sum()
}

/// Most frequent currency across `invoices`.
///
/// Ties go to USD when USD is among the leaders, otherwise to the
/// alphabetically first code. An empty set yields USD.
pub fn primary_currency<'a, I>(invoices: I) -> String
where
    I: IntoIterator<Item = &'a Invoice>,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for inv in invoices {
        *counts.entry(normalize(&inv.currency_type)).or_default() += 1;
    }

    let Some(max) = counts.values().copied().max() else {
        return BASE_CURRENCY.to_string();
    };

    if counts.get(BASE_CURRENCY) == Some(&max) {
        return BASE_CURRENCY.to_string();
    }

    counts
        .into_iter()
        .find(|(_, count)| *count == max)
        .map(|(code, _)| code.to_string())
        .unwrap_or_else(|| BASE_CURRENCY.to_string())
}

/// Two decimal places, halves away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InvoiceStatus;
    use chrono::Utc;

    fn invoice(amount: i64, currency: &str) -> Invoice {
        Invoice {
            id: "INV-1".to_string(),
            user_id: "USR-1".to_string(),
            client_id: "CLI-1".to_string(),
            client_name: "Acme".to_string(),
            invoice_date: "2024-01-15".to_string(),
            due_date: String::new(),
            amount: Decimal::from(amount),
            currency_type: currency.to_string(),
            status: InvoiceStatus::Unpaid.as_str().to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn mixed_usd_and_eur_total() {
        let invoices = vec![invoice(100, "USD"), invoice(100, "EUR")];
        let total = round_money(total_in_base(&invoices));
        assert_eq!(total, Decimal::new(20900, 2));
        assert_eq!(total.to_string(), "209.00");
    }

    #[test]
    fn empty_and_unknown_codes_convert_at_par() {
        assert_eq!(to_base(Decimal::from(50), ""), Decimal::from(50));
        assert_eq!(to_base(Decimal::from(50), "JPY"), Decimal::from(50));
    }

    #[test]
    fn from_base_inverts_rate() {
        let usd = to_base(Decimal::from(200), "GBP");
        assert_eq!(usd, Decimal::from(254));
        assert_eq!(from_base(usd, "GBP"), Decimal::from(200));
    }

    #[test]
    fn inr_uses_fractional_rate() {
        assert_eq!(to_base(Decimal::from(1000), "INR"), Decimal::from(12));
    }

    #[test]
    fn primary_currency_is_majority() {
        let invoices = vec![invoice(1, "EUR"), invoice(1, "EUR"), invoice(1, "USD")];
        assert_eq!(primary_currency(&invoices), "EUR");
    }

    #[test]
    fn primary_currency_tie_prefers_usd() {
        let invoices = vec![invoice(1, "GBP"), invoice(1, "USD")];
        assert_eq!(primary_currency(&invoices), "USD");
    }

    #[test]
    fn primary_currency_tie_without_usd_is_alphabetical() {
        let invoices = vec![invoice(1, "GBP"), invoice(1, "EUR"), invoice(1, "USD"), invoice(1, "EUR"), invoice(1, "GBP")];
        assert_eq!(primary_currency(&invoices), "EUR");
    }

    #[test]
    fn primary_currency_defaults_to_usd() {
        assert_eq!(primary_currency(&Vec::<Invoice>::new()), "USD");
        assert_eq!(primary_currency(&vec![invoice(1, "")]), "USD");
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(Decimal::new(12345, 3)), Decimal::new(1235, 2));
        assert_eq!(round_money(Decimal::new(12344, 3)), Decimal::new(1234, 2));
    }
}
