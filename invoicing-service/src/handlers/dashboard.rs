//! Dashboard and report endpoints. Each loads the caller's invoices (and
//! clients where needed) and hands them to [`crate::reporting`].

use axum::extract::{Json, Query, State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

use crate::currency;
use crate::middleware::auth::AuthUser;
use crate::models::{Invoice, ListInvoicesFilter};
use crate::reporting::{
    self, ClientRevenue, CollectionRate, Kpi, MonthlyRevenue, ReportsSummary, TopRevenueMonth,
};
use crate::startup::AppState;

const DEFAULT_RECENT_LIMIT: i64 = 5;

#[derive(Debug, Deserialize)]
pub struct RecentInvoicesQuery {
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PrimaryCurrencyResponse {
    pub primary_currency: String,
}

async fn all_invoices(state: &AppState, user_id: &str) -> Result<Vec<Invoice>, AppError> {
    state
        .store
        .list_invoices(user_id, &ListInvoicesFilter::default())
        .await
}

/// GET /api/dashboard/kpi
pub async fn kpi(State(state): State<AppState>, user: AuthUser) -> Result<Json<Kpi>, AppError> {
    let invoices = all_invoices(&state, user.id()).await?;
    let client_count = state.store.count_clients(user.id(), None).await?;

    Ok(Json(reporting::kpi(&invoices, client_count)))
}

/// GET /api/dashboard/revenue-chart
pub async fn revenue_chart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<MonthlyRevenue>>, AppError> {
    let invoices = all_invoices(&state, user.id()).await?;

    Ok(Json(reporting::revenue_chart(&invoices, Utc::now().date_naive())))
}

/// GET /api/dashboard/top-clients
pub async fn top_clients(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ClientRevenue>>, AppError> {
    let clients = state.store.list_clients(user.id(), None).await?;
    let invoices = all_invoices(&state, user.id()).await?;

    Ok(Json(reporting::top_clients(&clients, &invoices)))
}

/// GET /api/dashboard/recent-invoices?limit=5
pub async fn recent_invoices(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<RecentInvoicesQuery>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    let limit = query
        .limit
        .as_deref()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|limit| *limit > 0)
        .unwrap_or(DEFAULT_RECENT_LIMIT);

    let filter = ListInvoicesFilter {
        limit: Some(limit),
        ..Default::default()
    };

    Ok(Json(state.store.list_invoices(user.id(), &filter).await?))
}

/// GET /api/dashboard/reports-summary
pub async fn reports_summary(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ReportsSummary>, AppError> {
    let clients = state.store.list_clients(user.id(), None).await?;
    let invoices = all_invoices(&state, user.id()).await?;

    Ok(Json(reporting::reports_summary(&clients, &invoices)))
}

/// GET /api/dashboard/collection-rate
pub async fn collection_rate(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<CollectionRate>, AppError> {
    let invoices = all_invoices(&state, user.id()).await?;
    Ok(Json(reporting::collection_rate(&invoices)))
}

/// GET /api/dashboard/top-revenue-month
pub async fn top_revenue_month(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<TopRevenueMonth>, AppError> {
    let invoices = all_invoices(&state, user.id()).await?;
    Ok(Json(reporting::top_revenue_month(&invoices)))
}

/// GET /api/dashboard/primary-currency
pub async fn primary_currency(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<PrimaryCurrencyResponse>, AppError> {
    let invoices = all_invoices(&state, user.id()).await?;

    Ok(Json(PrimaryCurrencyResponse {
        primary_currency: currency::primary_currency(&invoices),
    }))
}
