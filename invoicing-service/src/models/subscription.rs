use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Subscription status. Stored as text; no transition table is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "trialing" => SubscriptionStatus::Trialing,
            "past_due" => SubscriptionStatus::PastDue,
            "canceled" => SubscriptionStatus::Canceled,
            _ => SubscriptionStatus::Active,
        }
    }
}

/// A user's current plan. At most one per user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub plan_id: String,
    pub status: String,
    pub current_period_end: DateTime<Utc>,
    pub trial_end: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert-or-replace keyed by `user_id`; the id is kept on update.
#[derive(Debug, Clone)]
pub struct UpsertSubscription {
    pub user_id: String,
    pub plan_id: String,
    pub status: SubscriptionStatus,
    pub current_period_end: DateTime<Utc>,
    pub trial_end: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl UpsertSubscription {
    /// Starter trial handed to every newly synced user.
    pub fn starter_trial(user_id: &str, trial_days: i64) -> Self {
        let trial_end = Utc::now() + chrono::Duration::days(trial_days);
        Self {
            user_id: user_id.to_string(),
            plan_id: "PLN-STARTER".to_string(),
            status: SubscriptionStatus::Trialing,
            current_period_end: trial_end,
            trial_end: Some(trial_end),
            canceled_at: None,
        }
    }

    pub fn from_existing(sub: &Subscription) -> Self {
        Self {
            user_id: sub.user_id.clone(),
            plan_id: sub.plan_id.clone(),
            status: SubscriptionStatus::from_string(&sub.status),
            current_period_end: sub.current_period_end,
            trial_end: sub.trial_end,
            canceled_at: sub.canceled_at,
        }
    }
}
