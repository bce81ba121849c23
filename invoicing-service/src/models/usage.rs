use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Append-only usage event.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UsageLog {
    pub id: String,
    pub user_id: String,
    pub feature_type: String,
    pub count: i32,
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateUsageLog {
    pub user_id: String,
    pub feature_type: String,
    pub count: i32,
    pub metadata: Option<serde_json::Value>,
}
