//! Usage counter: append-only usage rows plus the daily analytics rollup.
//!
//! Nothing in here fails a request. Store errors are logged and counted.

use super::metrics::record_usage_event;
use super::store::Store;
use crate::models::{ActivityDelta, CreateUsageLog};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

pub const INVOICE_CREATED: &str = "invoice_created";
pub const CLIENT_CREATED: &str = "client_created";
pub const SUBSCRIPTION_CHANGED: &str = "subscription_changed";
pub const MESSAGE_SENT: &str = "message_sent";
pub const IMAGE_GENERATED: &str = "image_generated";

/// Prefix of the rows written by the rate limiter, one per admitted request.
pub const API_REQUEST_PREFIX: &str = "api_request_";

#[derive(Clone)]
pub struct UsageTracker {
    store: Arc<dyn Store>,
    enabled: bool,
}

impl UsageTracker {
    pub fn new(store: Arc<dyn Store>, enabled: bool) -> Self {
        Self { store, enabled }
    }

    /// Appends one usage row with `count = 1`.
    pub async fn track(
        &self,
        user_id: &str,
        feature_type: &str,
        metadata: Option<serde_json::Value>,
    ) {
        if !self.enabled {
            return;
        }

        let result = self
            .store
            .record_usage(CreateUsageLog {
                user_id: user_id.to_string(),
                feature_type: feature_type.to_string(),
                count: 1,
                metadata,
            })
            .await;

        match result {
            Ok(log) => {
                record_usage_event(feature_type, true);
                debug!(usage_id = %log.id, user_id, feature_type, "Usage recorded");
            }
            Err(e) => {
                record_usage_event(feature_type, false);
                warn!(error = %e, user_id, feature_type, "Failed to record usage");
            }
        }
    }

    /// Adds `delta` to today's rollup row.
    pub async fn bump_daily(&self, user_id: &str, delta: ActivityDelta) {
        let today = Utc::now().date_naive();
        if let Err(e) = self
            .store
            .record_daily_activity(user_id, today, &delta)
            .await
        {
            warn!(error = %e, user_id, "Failed to update daily analytics");
        }
    }
}

/// Midnight UTC on the first day of `now`'s month.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Midnight UTC on the first day of the month after `now`'s.
pub fn next_month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}
