//! Subscription, plan catalog and usage handlers.

use axum::extract::{Json, Path, State};
use chrono::{DateTime, Duration, Months, Utc};
use serde_json::json;
use service_core::error::AppError;

use crate::dtos::subscription::{
    ChangeSubscriptionRequest, CurrentUsage, FeatureCheckResponse, PlanLimits, PlanSummary,
    PlansResponse, SubscriptionResponse, SubscriptionStatusResponse, UsagePeriod, UsageResponse,
};
use crate::middleware::auth::AuthUser;
use crate::middleware::feature_gate::is_feature_allowed;
use crate::models::{SubscriptionStatus, UpsertSubscription, UsageLog};
use crate::services::subscribed_plan;
use crate::services::usage::{month_start, IMAGE_GENERATED, MESSAGE_SENT, SUBSCRIPTION_CHANGED};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

fn subscription_not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Subscription not found"))
}

fn one_month_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_months(Months::new(1))
        .unwrap_or(now + Duration::days(30))
}

/// Sum of `count` over rows of one feature type.
fn usage_total(logs: &[UsageLog], feature_type: &str) -> i64 {
    logs.iter()
        .filter(|log| log.feature_type == feature_type)
        .map(|log| i64::from(log.count))
        .sum()
}

/// GET /api/subscription/status
pub async fn subscription_status(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<SubscriptionStatusResponse>, AppError> {
    let (subscription, plan) = subscribed_plan(state.store.as_ref(), user.id())
        .await?
        .ok_or_else(subscription_not_found)?;

    Ok(Json(SubscriptionStatusResponse { subscription, plan }))
}

/// POST /api/subscription/change
///
/// Subscribes the caller to `plan_id`. A canceled subscription is
/// reactivated for a fresh one-month period.
pub async fn change_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<ChangeSubscriptionRequest>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let plan = state
        .store
        .get_plan(req.plan_id.trim())
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Plan not found")))?;

    let now = Utc::now();
    let existing = state.store.get_subscription(user.id()).await?;
    let old_plan_id = existing.as_ref().map(|sub| sub.plan_id.clone());

    let input = match existing {
        Some(sub) if SubscriptionStatus::from_string(&sub.status) != SubscriptionStatus::Canceled => {
            UpsertSubscription {
                plan_id: plan.id.clone(),
                ..UpsertSubscription::from_existing(&sub)
            }
        }
        _ => UpsertSubscription {
            user_id: user.id().to_string(),
            plan_id: plan.id.clone(),
            status: SubscriptionStatus::Active,
            current_period_end: one_month_from(now),
            trial_end: None,
            canceled_at: None,
        },
    };

    let subscription = state.store.upsert_subscription(input).await?;

    state
        .usage
        .track(
            user.id(),
            SUBSCRIPTION_CHANGED,
            Some(json!({ "old_plan_id": old_plan_id, "new_plan_id": plan.id })),
        )
        .await;

    tracing::info!(
        user_id = %user.id(),
        plan = %plan.name,
        status = %subscription.status,
        "Subscription changed"
    );

    Ok(Json(SubscriptionResponse {
        message: "Subscription updated successfully".to_string(),
        subscription,
    }))
}

/// POST /api/subscription/cancel
pub async fn cancel_subscription(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let existing = state
        .store
        .get_subscription(user.id())
        .await?
        .ok_or_else(subscription_not_found)?;

    let subscription = state
        .store
        .upsert_subscription(UpsertSubscription {
            status: SubscriptionStatus::Canceled,
            canceled_at: Some(Utc::now()),
            ..UpsertSubscription::from_existing(&existing)
        })
        .await?;

    tracing::info!(user_id = %user.id(), plan_id = %subscription.plan_id, "Subscription canceled");

    Ok(Json(SubscriptionResponse {
        message: "Subscription canceled successfully".to_string(),
        subscription,
    }))
}

/// GET /api/subscription/usage
///
/// Month-to-date usage against the current plan's limits.
pub async fn subscription_usage(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UsageResponse>, AppError> {
    let (subscription, plan) = subscribed_plan(state.store.as_ref(), user.id())
        .await?
        .ok_or_else(subscription_not_found)?;

    let start = month_start(Utc::now());
    let logs = state.store.list_usage(user.id(), start).await?;

    let current_usage = CurrentUsage {
        invoices_created: state.store.count_invoices(user.id(), Some(start)).await?,
        clients_created: state.store.count_clients(user.id(), Some(start)).await?,
        messages_sent: usage_total(&logs, MESSAGE_SENT),
        images_generated: usage_total(&logs, IMAGE_GENERATED),
    };

    Ok(Json(UsageResponse {
        current_usage,
        limits: PlanLimits::from(&plan),
        period: UsagePeriod {
            start,
            end: subscription.current_period_end,
        },
    }))
}

/// GET /api/subscription/plans
pub async fn list_plans(State(state): State<AppState>) -> Result<Json<PlansResponse>, AppError> {
    let plans = state.store.list_plans().await?;
    if plans.is_empty() {
        return Err(AppError::NotFound(anyhow::anyhow!("No plans available")));
    }

    Ok(Json(PlansResponse {
        plans: plans.into_iter().map(PlanSummary::from).collect(),
    }))
}

/// GET /api/subscription/features/:feature
pub async fn check_feature(
    State(state): State<AppState>,
    user: AuthUser,
    Path(feature): Path<String>,
) -> Result<Json<FeatureCheckResponse>, AppError> {
    let plan = subscribed_plan(state.store.as_ref(), user.id())
        .await?
        .map(|(_, plan)| plan);

    let allowed = plan
        .as_ref()
        .is_some_and(|plan| is_feature_allowed(&feature, plan));

    Ok(Json(FeatureCheckResponse {
        feature,
        allowed,
        current_plan: plan.map(|plan| plan.name),
    }))
}
