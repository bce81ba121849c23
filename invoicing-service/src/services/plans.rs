//! Plan lookups shared by the rate limiter, the feature gate and the
//! subscription endpoints.

use super::store::Store;
use crate::models::{Plan, Subscription};
use service_core::error::AppError;

/// The user's subscription together with its plan. `None` when the user has
/// no subscription or it points at a plan that no longer exists.
pub async fn subscribed_plan(
    store: &dyn Store,
    user_id: &str,
) -> Result<Option<(Subscription, Plan)>, AppError> {
    let Some(subscription) = store.get_subscription(user_id).await? else {
        return Ok(None);
    };

    Ok(store
        .get_plan(&subscription.plan_id)
        .await?
        .map(|plan| (subscription, plan)))
}
