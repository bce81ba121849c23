use super::Invoice;
use crate::currency::round_money;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A customer of the user. The `total_*`, `invoice_count` and
/// `average_invoice` columns are a cache of [`ClientStats`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub payment_delay: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_invoiced: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_paid: Decimal,
    pub invoice_count: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub average_invoice: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateClient {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub payment_delay: i32,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateClient {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub payment_delay: Option<i32>,
}

impl Client {
    pub fn apply(&mut self, update: &UpdateClient) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(email) = &update.email {
            self.email = email.clone();
        }
        if let Some(avatar) = &update.avatar {
            self.avatar = avatar.clone();
        }
        if let Some(payment_delay) = update.payment_delay {
            self.payment_delay = payment_delay;
        }
    }

    pub fn set_stats(&mut self, stats: &ClientStats) {
        self.total_invoiced = stats.total_invoiced;
        self.total_paid = stats.total_paid;
        self.invoice_count = stats.invoice_count;
        self.average_invoice = stats.average_invoice;
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            total_invoiced: self.total_invoiced,
            total_paid: self.total_paid,
            invoice_count: self.invoice_count,
            average_invoice: self.average_invoice,
        }
    }
}

/// Aggregates over one client's invoices, in their stored amounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientStats {
    pub total_invoiced: Decimal,
    pub total_paid: Decimal,
    pub invoice_count: i32,
    pub average_invoice: Decimal,
}

impl ClientStats {
    pub fn from_invoices<'a, I>(invoices: I) -> Self
    where
        I: IntoIterator<Item = &'a Invoice>,
    {
        let mut stats = ClientStats::default();
        for inv in invoices {
            stats.total_invoiced += inv.amount;
            if inv.is_paid() {
                stats.total_paid += inv.amount;
            }
            stats.invoice_count += 1;
        }

        if stats.invoice_count > 0 {
            stats.average_invoice =
                round_money(stats.total_invoiced / Decimal::from(stats.invoice_count));
        }

        stats
    }
}
