use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-user daily activity rollup. One row per user and day.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalyticsData {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub invoices_created: i32,
    pub clients_added: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue_generated: Decimal,
    pub messages_count: i32,
    pub created_at: DateTime<Utc>,
}

/// Increments added to a day's rollup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityDelta {
    pub invoices_created: i32,
    pub clients_added: i32,
    pub revenue_generated: Decimal,
    pub messages_count: i32,
}

impl ActivityDelta {
    pub fn invoice(amount: Decimal) -> Self {
        Self {
            invoices_created: 1,
            revenue_generated: amount,
            ..Default::default()
        }
    }

    pub fn client() -> Self {
        Self {
            clients_added: 1,
            ..Default::default()
        }
    }
}
