//! Analytics endpoints, gated on the `advanced_analytics` plan feature.

use axum::extract::{Json, State};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use service_core::error::AppError;

use crate::currency::{round_money, total_in_base};
use crate::middleware::auth::AuthUser;
use crate::models::{AnalyticsData, ListInvoicesFilter};
use crate::services::usage::{month_start, MESSAGE_SENT};
use crate::startup::AppState;

const USAGE_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub analytics: Vec<AnalyticsData>,
}

#[derive(Debug, Serialize)]
pub struct MonthStats {
    pub invoices_created: i64,
    pub clients_added: i64,
    pub messages_sent: i64,
    /// Invoiced this month, in USD.
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue_generated: Decimal,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub current_month: MonthStats,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsDashboardResponse {
    pub dashboard: DashboardStats,
}

/// GET /api/analytics/usage
pub async fn usage_analytics(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<AnalyticsResponse>, AppError> {
    let since = Utc::now().date_naive() - Duration::days(USAGE_WINDOW_DAYS);
    let analytics = state.store.list_analytics(user.id(), since).await?;

    if analytics.is_empty() {
        return Err(AppError::NotFound(anyhow::anyhow!("No analytics data found")));
    }

    Ok(Json(AnalyticsResponse { analytics }))
}

/// GET /api/analytics/dashboard
pub async fn analytics_dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<AnalyticsDashboardResponse>, AppError> {
    let start = month_start(Utc::now());

    let invoices = state
        .store
        .list_invoices(
            user.id(),
            &ListInvoicesFilter {
                created_since: Some(start),
                ..Default::default()
            },
        )
        .await?;
    let clients_added = state.store.count_clients(user.id(), Some(start)).await?;
    let messages_sent = state
        .store
        .list_usage(user.id(), start)
        .await?
        .iter()
        .filter(|log| log.feature_type == MESSAGE_SENT)
        .map(|log| i64::from(log.count))
        .sum();

    Ok(Json(AnalyticsDashboardResponse {
        dashboard: DashboardStats {
            current_month: MonthStats {
                invoices_created: invoices.len() as i64,
                clients_added,
                messages_sent,
                revenue_generated: round_money(total_in_base(&invoices)),
            },
        },
    }))
}
