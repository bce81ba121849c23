use rust_decimal::Decimal;
use serde::Deserialize;
use service_core::error::AppError;
use validator::Validate;

use super::{money_amount, optional_date};
use crate::models::InvoiceStatus;

/// Either `client_id` (an existing client of the caller) or a legacy
/// `client_name` (matched by name, created when missing) must be present.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    #[validate(custom(function = "optional_date"))]
    pub invoice_date: String,
    #[serde(default)]
    #[validate(custom(function = "optional_date"))]
    pub due_date: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[validate(custom(function = "money_amount"))]
    pub amount: Decimal,
    #[serde(default)]
    #[validate(length(max = 10))]
    pub currency_type: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateInvoiceRequest {
    pub client_id: Option<String>,
    pub client_name: Option<String>,
    #[validate(custom(function = "optional_date"))]
    pub invoice_date: Option<String>,
    #[validate(custom(function = "optional_date"))]
    pub due_date: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[validate(custom(function = "money_amount"))]
    pub amount: Option<Decimal>,
    #[validate(length(max = 10))]
    pub currency_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListInvoicesQuery {
    pub limit: Option<String>,
    pub status: Option<String>,
    pub client_id: Option<String>,
}

/// Missing or empty means unpaid; anything else must be a known status.
pub fn parse_status(raw: Option<&str>) -> Result<InvoiceStatus, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(InvoiceStatus::Unpaid),
        Some(s) => InvoiceStatus::parse(s)
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Invalid invoice status"))),
    }
}

/// Positive integers only; anything else means "no limit".
pub fn parse_limit(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|limit| *limit > 0)
}
