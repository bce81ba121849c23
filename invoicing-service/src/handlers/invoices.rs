//! Invoice handlers.
//!
//! Writes keep the owning client's aggregates current: the client an invoice
//! lands on (and the one it leaves, on reassignment) is refreshed afterwards.

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde_json::json;
use service_core::error::AppError;

use crate::currency::{normalize, round_money, to_base};
use crate::dtos::invoices::{
    parse_limit, parse_status, CreateInvoiceRequest, ListInvoicesQuery, UpdateInvoiceRequest,
};
use crate::dtos::MessageResponse;
use crate::middleware::auth::AuthUser;
use crate::middleware::feature_gate::{check_plan_quota, Quota};
use crate::models::{
    ActivityDelta, Client, CreateClient, CreateInvoice, Invoice, ListInvoicesFilter,
    UpdateInvoice,
};
use crate::services::metrics::{record_client_operation, record_invoice_created};
use crate::services::refresh_client_stats_by_id;
use crate::services::usage::{CLIENT_CREATED, INVOICE_CREATED};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

fn invoice_not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Invoice not found"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// The caller's client with id `client_id`, or 400.
async fn owned_client(state: &AppState, user_id: &str, client_id: &str) -> Result<Client, AppError> {
    state
        .store
        .get_client(user_id, client_id)
        .await?
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Invalid client selected")))
}

/// Legacy path: matches a client by exact name, creating it when missing.
async fn client_by_name(state: &AppState, user_id: &str, name: &str) -> Result<Client, AppError> {
    if let Some(client) = state.store.find_client_by_name(user_id, name).await? {
        return Ok(client);
    }

    check_plan_quota(state, user_id, Quota::Clients).await?;

    let client = state
        .store
        .create_client(CreateClient {
            user_id: user_id.to_string(),
            name: name.to_string(),
            email: String::new(),
            avatar: String::new(),
            payment_delay: 0,
        })
        .await?;

    record_client_operation("created");
    state
        .usage
        .track(
            user_id,
            CLIENT_CREATED,
            Some(json!({ "client_id": client.id, "client_name": client.name })),
        )
        .await;
    state.usage.bump_daily(user_id, ActivityDelta::client()).await;
    tracing::info!(user_id, client_id = %client.id, "Client created from invoice");

    Ok(client)
}

/// Logs and swallows a failed aggregate refresh; the invoice write stands.
async fn refresh_stats(state: &AppState, user_id: &str, client_id: &str) {
    if let Err(e) = refresh_client_stats_by_id(state.store.as_ref(), user_id, client_id).await {
        tracing::warn!(error = %e, user_id, client_id, "Failed to refresh client stats");
    }
}

/// POST /api/invoices
pub async fn create_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<Invoice>), AppError> {
    let status = parse_status(req.status.as_deref())?;

    // Checked first: a rejected create must not leave a new client behind
    check_plan_quota(&state, user.id(), Quota::Invoices).await?;

    let client = match (
        non_empty(Some(req.client_id)),
        non_empty(Some(req.client_name)),
    ) {
        (Some(client_id), _) => owned_client(&state, user.id(), &client_id).await?,
        (None, Some(name)) => client_by_name(&state, user.id(), &name).await?,
        (None, None) => {
            return Err(AppError::BadRequest(anyhow::anyhow!("Client is required")));
        }
    };

    let currency_type = normalize(&req.currency_type).to_string();
    let invoice = state
        .store
        .create_invoice(CreateInvoice {
            user_id: user.id().to_string(),
            client_id: client.id.clone(),
            client_name: client.name.clone(),
            invoice_date: req.invoice_date,
            due_date: req.due_date,
            amount: round_money(req.amount),
            currency_type,
            status,
        })
        .await?;

    refresh_stats(&state, user.id(), &client.id).await;

    record_invoice_created(&invoice.status, &invoice.currency_type, invoice.amount);
    state
        .usage
        .track(
            user.id(),
            INVOICE_CREATED,
            Some(json!({
                "invoice_id": invoice.id,
                "amount": invoice.amount,
                "currency": invoice.currency_type,
            })),
        )
        .await;
    state
        .usage
        .bump_daily(
            user.id(),
            ActivityDelta::invoice(round_money(to_base(invoice.amount, &invoice.currency_type))),
        )
        .await;

    tracing::info!(
        user_id = %user.id(),
        invoice_id = %invoice.id,
        client_id = %invoice.client_id,
        status = %invoice.status,
        "Invoice created"
    );

    Ok((StatusCode::CREATED, Json(invoice)))
}

/// GET /api/invoices?limit=&status=&client_id=
pub async fn list_invoices(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    let status = match non_empty(query.status) {
        Some(s) => Some(parse_status(Some(&s))?),
        None => None,
    };

    let filter = ListInvoicesFilter {
        client_id: non_empty(query.client_id),
        status,
        created_since: None,
        limit: parse_limit(query.limit.as_deref()),
    };

    let invoices = state.store.list_invoices(user.id(), &filter).await?;
    Ok(Json(invoices))
}

/// GET /api/invoices/:id
pub async fn get_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(invoice_id): Path<String>,
) -> Result<Json<Invoice>, AppError> {
    let invoice = state
        .store
        .get_invoice(user.id(), &invoice_id)
        .await?
        .ok_or_else(invoice_not_found)?;

    Ok(Json(invoice))
}

/// PUT /api/invoices/:id
///
/// Partial update. A new `client_id` must belong to the caller; a legacy
/// `client_name` is resolved like on create.
pub async fn update_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(invoice_id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateInvoiceRequest>,
) -> Result<Json<Invoice>, AppError> {
    let existing = state
        .store
        .get_invoice(user.id(), &invoice_id)
        .await?
        .ok_or_else(invoice_not_found)?;

    let status = match non_empty(req.status) {
        Some(s) => Some(parse_status(Some(&s))?),
        None => None,
    };

    let client = match (non_empty(req.client_id), non_empty(req.client_name)) {
        (Some(client_id), _) => Some(owned_client(&state, user.id(), &client_id).await?),
        (None, Some(name)) if name != existing.client_name => {
            Some(client_by_name(&state, user.id(), &name).await?)
        }
        _ => None,
    };

    let update = UpdateInvoice {
        client_id: client.as_ref().map(|c| c.id.clone()),
        client_name: client.as_ref().map(|c| c.name.clone()),
        invoice_date: req.invoice_date,
        due_date: req.due_date,
        amount: req.amount.map(round_money),
        currency_type: non_empty(req.currency_type).map(|c| normalize(&c).to_string()),
        status,
    };

    let invoice = state
        .store
        .update_invoice(user.id(), &invoice_id, update)
        .await?
        .ok_or_else(invoice_not_found)?;

    refresh_stats(&state, user.id(), &invoice.client_id).await;
    if existing.client_id != invoice.client_id {
        refresh_stats(&state, user.id(), &existing.client_id).await;
    }

    tracing::info!(user_id = %user.id(), invoice_id = %invoice.id, "Invoice updated");

    Ok(Json(invoice))
}

/// DELETE /api/invoices/:id
pub async fn delete_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(invoice_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let invoice = state
        .store
        .get_invoice(user.id(), &invoice_id)
        .await?
        .ok_or_else(invoice_not_found)?;

    if !state.store.delete_invoice(user.id(), &invoice_id).await? {
        return Err(invoice_not_found());
    }

    refresh_stats(&state, user.id(), &invoice.client_id).await;
    tracing::info!(user_id = %user.id(), invoice_id = %invoice_id, "Invoice deleted");

    Ok(Json(MessageResponse::new("Invoice deleted successfully")))
}
