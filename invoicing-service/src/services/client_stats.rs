//! Keeps the denormalized client aggregates in step with their invoices.

use super::store::Store;
use crate::models::{Client, ClientStats, ListInvoicesFilter};
use service_core::error::AppError;
use tracing::debug;

/// Recomputes `client`'s aggregates from its invoices, persisting them only
/// when they changed. Returns the client with fresh figures.
pub async fn refresh_client_stats(
    store: &dyn Store,
    mut client: Client,
) -> Result<Client, AppError> {
    let invoices = store
        .list_invoices(&client.user_id, &ListInvoicesFilter::for_client(&client.id))
        .await?;
    let stats = ClientStats::from_invoices(&invoices);

    if stats != client.stats() {
        store
            .update_client_stats(&client.user_id, &client.id, &stats)
            .await?;
        debug!(
            client_id = %client.id,
            invoice_count = stats.invoice_count,
            "Client stats refreshed"
        );
    }

    client.set_stats(&stats);
    Ok(client)
}

/// Refreshes by id; a client that no longer exists is skipped.
pub async fn refresh_client_stats_by_id(
    store: &dyn Store,
    user_id: &str,
    client_id: &str,
) -> Result<(), AppError> {
    if let Some(client) = store.get_client(user_id, client_id).await? {
        refresh_client_stats(store, client).await?;
    }
    Ok(())
}
