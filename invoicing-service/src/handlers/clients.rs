//! Client handlers. Every query is scoped to the authenticated user.

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use rust_decimal::prelude::ToPrimitive;
use serde_json::json;
use service_core::error::AppError;

use crate::dtos::clients::{
    CreateClientRequest, ListClientsQuery, RevenueDataQuery, RevenueDataResponse,
    UpdateClientRequest,
};
use crate::dtos::MessageResponse;
use crate::middleware::auth::AuthUser;
use crate::middleware::feature_gate::{check_plan_quota, Quota};
use crate::models::{ActivityDelta, Client, CreateClient, InvoiceStatus, ListInvoicesFilter};
use crate::reporting::client_revenue_series;
use crate::services::metrics::record_client_operation;
use crate::services::refresh_client_stats;
use crate::services::usage::CLIENT_CREATED;
use crate::startup::AppState;
use crate::utils::ValidatedJson;

const DEFAULT_REVENUE_MONTHS: usize = 7;
const MAX_REVENUE_MONTHS: usize = 120;

fn client_not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Client not found"))
}

/// Missing, unparseable or negative values fall back to the default.
fn revenue_months(raw: Option<&str>) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_REVENUE_MONTHS)
        .min(MAX_REVENUE_MONTHS)
}

/// POST /api/clients
pub async fn create_client(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    check_plan_quota(&state, user.id(), Quota::Clients).await?;

    let client = state
        .store
        .create_client(CreateClient {
            user_id: user.id().to_string(),
            name: req.name.trim().to_string(),
            email: req.email,
            avatar: req.avatar,
            payment_delay: req.payment_delay,
        })
        .await?;

    record_client_operation("created");
    state
        .usage
        .track(
            user.id(),
            CLIENT_CREATED,
            Some(json!({ "client_id": client.id, "client_name": client.name })),
        )
        .await;
    state.usage.bump_daily(user.id(), ActivityDelta::client()).await;

    tracing::info!(user_id = %user.id(), client_id = %client.id, "Client created");

    Ok((StatusCode::CREATED, Json(client)))
}

/// GET /api/clients?search=
pub async fn list_clients(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListClientsQuery>,
) -> Result<Json<Vec<Client>>, AppError> {
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let clients = state.store.list_clients(user.id(), search).await?;

    let mut refreshed = Vec::with_capacity(clients.len());
    for client in clients {
        refreshed.push(refresh_client_stats(state.store.as_ref(), client).await?);
    }

    Ok(Json(refreshed))
}

/// GET /api/clients/:id
pub async fn get_client(
    State(state): State<AppState>,
    user: AuthUser,
    Path(client_id): Path<String>,
) -> Result<Json<Client>, AppError> {
    let client = state
        .store
        .get_client(user.id(), &client_id)
        .await?
        .ok_or_else(client_not_found)?;

    Ok(Json(refresh_client_stats(state.store.as_ref(), client).await?))
}

/// PUT /api/clients/:id
pub async fn update_client(
    State(state): State<AppState>,
    user: AuthUser,
    Path(client_id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateClientRequest>,
) -> Result<Json<Client>, AppError> {
    let client = state
        .store
        .update_client(user.id(), &client_id, req.into())
        .await?
        .ok_or_else(client_not_found)?;

    record_client_operation("updated");
    tracing::info!(user_id = %user.id(), client_id = %client.id, "Client updated");

    Ok(Json(refresh_client_stats(state.store.as_ref(), client).await?))
}

/// DELETE /api/clients/:id
///
/// Clients that still have invoices cannot be deleted.
pub async fn delete_client(
    State(state): State<AppState>,
    user: AuthUser,
    Path(client_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    if state.store.get_client(user.id(), &client_id).await?.is_none() {
        return Err(client_not_found());
    }

    let invoices = state
        .store
        .list_invoices(user.id(), &ListInvoicesFilter::for_client(&client_id))
        .await?;
    if !invoices.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Cannot delete client with existing invoices"
        )));
    }

    if !state.store.delete_client(user.id(), &client_id).await? {
        return Err(client_not_found());
    }

    record_client_operation("deleted");
    tracing::info!(user_id = %user.id(), client_id = %client_id, "Client deleted");

    Ok(Json(MessageResponse::new("Client deleted successfully")))
}

/// GET /api/clients/:id/revenue-data?months=7
///
/// Amounts of the client's most recent paid invoices, newest first, padded
/// with zeros to `months` entries.
pub async fn client_revenue_data(
    State(state): State<AppState>,
    user: AuthUser,
    Path(client_id): Path<String>,
    Query(query): Query<RevenueDataQuery>,
) -> Result<Json<RevenueDataResponse>, AppError> {
    if state.store.get_client(user.id(), &client_id).await?.is_none() {
        return Err(client_not_found());
    }

    let months = revenue_months(query.months.as_deref());
    let filter = ListInvoicesFilter {
        status: Some(InvoiceStatus::Paid),
        ..ListInvoicesFilter::for_client(&client_id)
    };
    let invoices = state.store.list_invoices(user.id(), &filter).await?;

    let revenue_data = client_revenue_series(&invoices, months)
        .into_iter()
        .map(|amount| amount.to_f64().unwrap_or_default())
        .collect();

    Ok(Json(RevenueDataResponse {
        client_id,
        months,
        revenue_data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revenue_months_defaults_and_caps() {
        assert_eq!(revenue_months(None), 7);
        assert_eq!(revenue_months(Some("12")), 12);
        assert_eq!(revenue_months(Some("-1")), 7);
        assert_eq!(revenue_months(Some("six")), 7);
        assert_eq!(revenue_months(Some("0")), 0);
        assert_eq!(revenue_months(Some("100000")), MAX_REVENUE_MONTHS);
    }
}
