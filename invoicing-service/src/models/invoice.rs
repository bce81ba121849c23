//! Invoice model for invoicing-service.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Paid,
    Unpaid,
    Overdue,
    Processing,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Processing => "processing",
        }
    }

    pub fn from_string(s: &str) -> Self {
        Self::parse(s).unwrap_or(InvoiceStatus::Unpaid)
    }

    /// Strict variant of [`from_string`](Self::from_string) for validating input.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "paid" => Some(InvoiceStatus::Paid),
            "unpaid" => Some(InvoiceStatus::Unpaid),
            "overdue" => Some(InvoiceStatus::Overdue),
            "processing" => Some(InvoiceStatus::Processing),
            _ => None,
        }
    }
}

/// Invoice record. Dates are kept as `YYYY-MM-DD` strings; `client_name` is a
/// display copy of the owning client's name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: String,
    pub user_id: String,
    pub client_id: String,
    pub client_name: String,
    pub invoice_date: String,
    pub due_date: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid.as_str()
    }

    /// Parsed `invoice_date`, if it is a valid calendar date.
    pub fn invoice_day(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.invoice_date, "%Y-%m-%d").ok()
    }

    pub fn apply(&mut self, update: &UpdateInvoice) {
        if let Some(client_id) = &update.client_id {
            self.client_id = client_id.clone();
        }
        if let Some(client_name) = &update.client_name {
            self.client_name = client_name.clone();
        }
        if let Some(invoice_date) = &update.invoice_date {
            self.invoice_date = invoice_date.clone();
        }
        if let Some(due_date) = &update.due_date {
            self.due_date = due_date.clone();
        }
        if let Some(amount) = update.amount {
            self.amount = amount;
        }
        if let Some(currency_type) = &update.currency_type {
            self.currency_type = currency_type.clone();
        }
        if let Some(status) = update.status {
            self.status = status.as_str().to_string();
        }
    }
}

/// Filter parameters for listing invoices. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub client_id: Option<String>,
    pub status: Option<InvoiceStatus>,
    pub created_since: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl ListInvoicesFilter {
    pub fn for_client(client_id: &str) -> Self {
        Self {
            client_id: Some(client_id.to_string()),
            ..Default::default()
        }
    }

    pub fn matches(&self, invoice: &Invoice) -> bool {
        self.client_id
            .as_deref()
            .is_none_or(|id| invoice.client_id == id)
            && self
                .status
                .is_none_or(|status| invoice.status == status.as_str())
            && self
                .created_since
                .is_none_or(|since| invoice.created_at >= since)
    }
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub user_id: String,
    pub client_id: String,
    pub client_name: String,
    pub invoice_date: String,
    pub due_date: String,
    pub amount: Decimal,
    pub currency_type: String,
    pub status: InvoiceStatus,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoice {
    pub client_id: Option<String>,
    pub client_name: Option<String>,
    pub invoice_date: Option<String>,
    pub due_date: Option<String>,
    pub amount: Option<Decimal>,
    pub currency_type: Option<String>,
    pub status: Option<InvoiceStatus>,
}
