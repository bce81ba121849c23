//! Dashboard and report aggregations over one user's invoices and clients.
//!
//! Amounts are summed in USD and converted to the display currency at the
//! end, then rounded to cents.

use crate::currency::{self, from_base, primary_currency, round_money, to_base};
use crate::models::{Client, Invoice};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

const CHART_MONTHS: i32 = 12;
const TOP_CLIENTS: usize = 5;
const NO_TOP_MONTH: &str = "Current Month";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_invoiced: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_paid: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub outstanding: Decimal,
    pub client_count: i64,
    pub primary_currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRevenue {
    pub month: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientRevenue {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportsSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub collection_rate: Decimal,
    pub top_client: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub top_client_revenue: Decimal,
    pub top_revenue_month: String,
    pub client_count: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub average_per_client: Decimal,
    pub primary_currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionRate {
    #[serde(with = "rust_decimal::serde::float")]
    pub collection_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_invoiced: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_paid: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopRevenueMonth {
    pub top_month: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub top_month_revenue: Decimal,
}

/// USD totals over all invoices and over the paid ones.
fn usd_totals(invoices: &[Invoice]) -> (Decimal, Decimal) {
    let total = currency::total_in_base(invoices);
    let paid = currency::total_in_base(invoices.iter().filter(|inv| inv.is_paid()));
    (total, paid)
}

fn display(amount_usd: Decimal, code: &str) -> Decimal {
    round_money(from_base(amount_usd, code))
}

fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        round_money(part / whole * Decimal::ONE_HUNDRED)
    }
}

/// Paid revenue per `(year, month)` of `invoice_date`, in USD. Invoices
/// without a parseable date are skipped.
fn paid_revenue_by_month(invoices: &[Invoice]) -> BTreeMap<(i32, u32), Decimal> {
    let mut months = BTreeMap::new();
    for inv in invoices.iter().filter(|inv| inv.is_paid()) {
        if let Some(day) = inv.invoice_day() {
            *months.entry((day.year(), day.month())).or_default() +=
                to_base(inv.amount, &inv.currency_type);
        }
    }
    months
}

/// Month with the highest paid revenue. Earlier months win ties; months with
/// no revenue never qualify.
fn top_month(invoices: &[Invoice]) -> Option<((i32, u32), Decimal)> {
    paid_revenue_by_month(invoices)
        .into_iter()
        .fold(None, |best, (month, revenue)| match best {
            Some((_, top)) if revenue <= top => best,
            _ if revenue > Decimal::ZERO => Some((month, revenue)),
            _ => best,
        })
}

fn month_label(year: i32, month: u32, format: &str) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format(format).to_string())
        .unwrap_or_default()
}

/// Paid revenue per client, in USD, keeping `clients` order.
fn client_revenue_usd(clients: &[Client], invoices: &[Invoice]) -> Vec<(String, Decimal)> {
    clients
        .iter()
        .map(|client| {
            let revenue = currency::total_in_base(
                invoices
                    .iter()
                    .filter(|inv| inv.client_id == client.id && inv.is_paid()),
            );
            (client.name.clone(), revenue)
        })
        .collect()
}

pub fn kpi(invoices: &[Invoice], client_count: i64) -> Kpi {
    let primary = primary_currency(invoices);
    let (total_usd, paid_usd) = usd_totals(invoices);

    let total_invoiced = display(total_usd, &primary);
    let total_paid = display(paid_usd, &primary);

    Kpi {
        total_invoiced,
        total_paid,
        outstanding: total_invoiced - total_paid,
        client_count,
        primary_currency: primary,
    }
}

/// Trailing twelve calendar months ending with `today`'s, oldest first.
/// The display currency is the majority currency of the paid invoices.
pub fn revenue_chart(invoices: &[Invoice], today: NaiveDate) -> Vec<MonthlyRevenue> {
    let primary = primary_currency(invoices.iter().filter(|inv| inv.is_paid()));
    let by_month = paid_revenue_by_month(invoices);
    let current = today.year() * 12 + today.month0() as i32;

    (0..CHART_MONTHS)
        .rev()
        .map(|back| {
            let index = current - back;
            let (year, month) = (index.div_euclid(12), index.rem_euclid(12) as u32 + 1);
            let usd = by_month.get(&(year, month)).copied().unwrap_or_default();
            MonthlyRevenue {
                month: month_label(year, month, "%b"),
                revenue: display(usd, &primary),
            }
        })
        .collect()
}

/// Clients ranked by paid revenue, zero-revenue clients included.
pub fn top_clients(clients: &[Client], invoices: &[Invoice]) -> Vec<ClientRevenue> {
    let primary = primary_currency(invoices);
    let mut ranked = client_revenue_usd(clients, invoices);
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(TOP_CLIENTS)
        .map(|(name, usd)| ClientRevenue {
            name,
            revenue: display(usd, &primary),
        })
        .collect()
}

pub fn reports_summary(clients: &[Client], invoices: &[Invoice]) -> ReportsSummary {
    let primary = primary_currency(invoices);
    let (total_usd, paid_usd) = usd_totals(invoices);
    let client_count = clients.len() as i64;

    let total_revenue = display(total_usd, &primary);
    let average_per_client = if client_count > 0 {
        round_money(total_revenue / Decimal::from(client_count))
    } else {
        Decimal::ZERO
    };

    let (top_client, top_client_usd) = client_revenue_usd(clients, invoices)
        .into_iter()
        .fold((String::new(), Decimal::ZERO), |best, candidate| {
            if candidate.1 > best.1 { candidate } else { best }
        });

    let top_revenue_month = top_month(invoices)
        .map(|((year, month), _)| month_label(year, month, "%B %Y"))
        .unwrap_or_else(|| NO_TOP_MONTH.to_string());

    ReportsSummary {
        total_revenue,
        collection_rate: percentage(paid_usd, total_usd),
        top_client,
        top_client_revenue: display(top_client_usd, &primary),
        top_revenue_month,
        client_count,
        average_per_client,
        primary_currency: primary,
    }
}

/// Collection rate with USD totals.
pub fn collection_rate(invoices: &[Invoice]) -> CollectionRate {
    let (total_usd, paid_usd) = usd_totals(invoices);
    CollectionRate {
        collection_rate: percentage(paid_usd, total_usd),
        total_invoiced: round_money(total_usd),
        total_paid: round_money(paid_usd),
    }
}

pub fn top_revenue_month(invoices: &[Invoice]) -> TopRevenueMonth {
    match top_month(invoices) {
        Some(((year, month), usd)) => TopRevenueMonth {
            top_month: month_label(year, month, "%B %Y"),
            top_month_revenue: round_money(usd),
        },
        None => TopRevenueMonth {
            top_month: NO_TOP_MONTH.to_string(),
            top_month_revenue: Decimal::ZERO,
        },
    }
}

/// The last `months` paid invoice amounts, newest invoice date first,
/// padded with zeros to exactly `months` entries.
pub fn client_revenue_series(invoices: &[Invoice], months: usize) -> Vec<Decimal> {
    let mut paid: Vec<&Invoice> = invoices.iter().filter(|inv| inv.is_paid()).collect();
    paid.sort_by(|a, b| b.invoice_date.cmp(&a.invoice_date));

    let mut series: Vec<Decimal> = paid.into_iter().take(months).map(|inv| inv.amount).collect();
    series.resize(months, Decimal::ZERO);
    series
}
