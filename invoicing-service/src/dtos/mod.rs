//! Request and response bodies of the HTTP API.

pub mod auth;
pub mod clients;
pub mod invoices;
pub mod settings;
pub mod subscription;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use validator::ValidationError;

/// `{"message": "..."}` acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Empty, or a `YYYY-MM-DD` calendar date.
pub(crate) fn optional_date(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
        Ok(())
    } else {
        Err(ValidationError::new("date_format"))
    }
}

/// Largest amount an invoice column (`NUMERIC(14, 2)`) holds.
pub fn max_amount() -> Decimal {
    Decimal::new(99_999_999_999_999, 2)
}

/// Between zero and [`max_amount`], inclusive.
pub(crate) fn money_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        Err(ValidationError::new("negative_amount"))
    } else if *value > max_amount() {
        Err(ValidationError::new("amount_too_large"))
    } else {
        Ok(())
    }
}
