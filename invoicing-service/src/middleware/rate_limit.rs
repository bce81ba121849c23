//! Per-plan hourly request limits backed by the usage log.
//!
//! Every admitted request appends an `api_request_<path>` row; the limit
//! check counts those rows over the trailing hour. Check and append are
//! separate statements, so concurrent requests can both be admitted.

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use serde_json::json;
use service_core::error::AppError;

use crate::middleware::auth::AuthUser;
use crate::models::CreateUsageLog;
use crate::services::metrics::{record_rate_limit, record_usage_event};
use crate::services::subscribed_plan;
use crate::services::usage::API_REQUEST_PREFIX;
use crate::startup::AppState;

const WINDOW_SECS: i64 = 3600;
const DEFAULT_TIER: PlanTier = PlanTier::Starter;

/// Endpoints with their own bucket. Anything else falls into `default`.
pub const LIMITED_ENDPOINTS: [&str; 3] = ["/api/invoices", "/api/clients", "/api/dashboard"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanTier {
    Starter,
    Pro,
    Business,
}

impl PlanTier {
    /// Case-insensitive; unknown names get starter limits.
    pub fn from_plan_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "pro" => PlanTier::Pro,
            "business" => PlanTier::Business,
            _ => DEFAULT_TIER,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Starter => "starter",
            PlanTier::Pro => "pro",
            PlanTier::Business => "business",
        }
    }

    /// Requests per hour for `endpoint`, where `None` is the default bucket.
    pub fn limit(&self, endpoint: Option<&str>) -> i64 {
        match (self, endpoint) {
            (PlanTier::Starter, Some("/api/invoices")) => 50,
            (PlanTier::Starter, Some("/api/clients")) => 20,
            (PlanTier::Starter, Some("/api/dashboard")) => 100,
            (PlanTier::Starter, _) => 30,
            (PlanTier::Pro, Some("/api/invoices")) => 200,
            (PlanTier::Pro, Some("/api/clients")) => 100,
            (PlanTier::Pro, Some("/api/dashboard")) => 500,
            (PlanTier::Pro, _) => 150,
            (PlanTier::Business, Some("/api/invoices")) => 1000,
            (PlanTier::Business, Some("/api/clients")) => 500,
            (PlanTier::Business, Some("/api/dashboard")) => 2000,
            (PlanTier::Business, _) => 500,
        }
    }
}

/// Bucket a request path is counted against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    /// Matched table endpoint, `None` for the default bucket.
    pub endpoint: Option<&'static str>,
    /// Key of the usage rows: the request path as received.
    pub key: String,
}

impl Bucket {
    pub fn feature_type(&self) -> String {
        format!("{}{}", API_REQUEST_PREFIX, self.key)
    }
}

/// Only exact table paths get their endpoint limit. Everything else,
/// including `/api/invoices/:id` and `/api/dashboard/kpi`, gets the default
/// limit and is counted under its own path.
pub fn resolve_bucket(path: &str) -> Bucket {
    Bucket {
        endpoint: LIMITED_ENDPOINTS.into_iter().find(|endpoint| *endpoint == path),
        key: path.to_string(),
    }
}

/// Runs after [`auth_middleware`](super::auth::auth_middleware).
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.config.limits.rate_limit_enabled {
        return Ok(next.run(req).await);
    }

    let Some(user) = req.extensions().get::<AuthUser>().cloned() else {
        return Ok(next.run(req).await);
    };

    let tier = subscribed_plan(state.store.as_ref(), user.id())
        .await?
        .map(|(_, plan)| PlanTier::from_plan_name(&plan.name))
        .unwrap_or(DEFAULT_TIER);

    let bucket = resolve_bucket(req.uri().path());
    let feature_type = bucket.feature_type();
    let limit = tier.limit(bucket.endpoint);

    let now = Utc::now();
    let reset_time = (now + Duration::seconds(WINDOW_SECS)).timestamp();
    let used = state
        .store
        .count_usage(user.id(), &feature_type, now - Duration::seconds(WINDOW_SECS))
        .await?;

    if used >= limit {
        record_rate_limit(tier.as_str(), false);
        tracing::info!(
            user_id = %user.id(),
            plan = tier.as_str(),
            endpoint = %bucket.key,
            limit,
            "Rate limit exceeded"
        );
        return Err(AppError::RateLimited { limit, reset_time });
    }

    record_rate_limit(tier.as_str(), true);

    let logged = state
        .store
        .record_usage(CreateUsageLog {
            user_id: user.id().to_string(),
            feature_type: feature_type.clone(),
            count: 1,
            metadata: Some(json!({
                "endpoint": bucket.key,
                "method": req.method().as_str(),
            })),
        })
        .await;
    record_usage_event(&feature_type, logged.is_ok());
    if let Err(e) = logged {
        tracing::warn!(error = %e, user_id = %user.id(), "Failed to log API request");
    }

    let mut res = next.run(req).await;

    let remaining = (limit - used - 1).max(0);
    let headers = res.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(reset_time));

    Ok(res)
}
