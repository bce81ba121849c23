use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Plan, Subscription};

#[derive(Debug, Serialize)]
pub struct SubscriptionStatusResponse {
    pub subscription: Subscription,
    pub plan: Plan,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ChangeSubscriptionRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Plan ID is required"))]
    pub plan_id: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub message: String,
    pub subscription: Subscription,
}

#[derive(Debug, Default, Serialize)]
pub struct CurrentUsage {
    pub invoices_created: i64,
    pub clients_created: i64,
    pub messages_sent: i64,
    pub images_generated: i64,
}

#[derive(Debug, Serialize)]
pub struct PlanLimits {
    pub invoice_limit: i32,
    pub client_limit: i32,
    pub messages_per_day: i32,
    pub image_generation: bool,
    pub custom_voice: bool,
    pub priority_support: bool,
    pub advanced_analytics: bool,
    pub api_access: bool,
    pub white_label: bool,
}

impl From<&Plan> for PlanLimits {
    fn from(plan: &Plan) -> Self {
        Self {
            invoice_limit: plan.invoice_limit,
            client_limit: plan.client_limit,
            messages_per_day: plan.messages_per_day,
            image_generation: plan.image_generation,
            custom_voice: plan.custom_voice,
            priority_support: plan.priority_support,
            advanced_analytics: plan.advanced_analytics,
            api_access: plan.api_access,
            white_label: plan.white_label,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UsagePeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub current_usage: CurrentUsage,
    pub limits: PlanLimits,
    pub period: UsagePeriod,
}

#[derive(Debug, Serialize)]
pub struct PlanSummary {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub currency: String,
    pub interval: String,
    pub features: Vec<String>,
    pub popular: bool,
}

impl From<Plan> for PlanSummary {
    fn from(plan: Plan) -> Self {
        Self {
            features: plan.feature_list(),
            popular: plan.is_popular(),
            id: plan.id,
            name: plan.name,
            price: plan.price,
            currency: plan.currency,
            interval: plan.interval,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub plans: Vec<PlanSummary>,
}

#[derive(Debug, Serialize)]
pub struct FeatureCheckResponse {
    pub feature: String,
    pub allowed: bool,
    pub current_plan: Option<String>,
}
