//! Plan feature flags and the route guard built on them.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::middleware::auth::AuthUser;
use crate::models::{Plan, UNLIMITED};
use crate::services::metrics::record_feature_check;
use crate::services::subscribed_plan;
use crate::services::usage::month_start;
use crate::startup::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    ImageGeneration,
    CustomVoice,
    PrioritySupport,
    AdvancedAnalytics,
    ApiAccess,
    WhiteLabel,
}

impl Feature {
    pub const ALL: [Feature; 6] = [
        Feature::ImageGeneration,
        Feature::CustomVoice,
        Feature::PrioritySupport,
        Feature::AdvancedAnalytics,
        Feature::ApiAccess,
        Feature::WhiteLabel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::ImageGeneration => "image_generation",
            Feature::CustomVoice => "custom_voice",
            Feature::PrioritySupport => "priority_support",
            Feature::AdvancedAnalytics => "advanced_analytics",
            Feature::ApiAccess => "api_access",
            Feature::WhiteLabel => "white_label",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    pub fn enabled_in(&self, plan: &Plan) -> bool {
        match self {
            Feature::ImageGeneration => plan.image_generation,
            Feature::CustomVoice => plan.custom_voice,
            Feature::PrioritySupport => plan.priority_support,
            Feature::AdvancedAnalytics => plan.advanced_analytics,
            Feature::ApiAccess => plan.api_access,
            Feature::WhiteLabel => plan.white_label,
        }
    }
}

/// Whether `plan` includes the feature called `name`. Names that are not
/// plan features are allowed.
pub fn is_feature_allowed(name: &str, plan: &Plan) -> bool {
    match Feature::parse(name) {
        Some(feature) => feature.enabled_in(plan),
        None => {
            tracing::warn!(feature = name, plan = %plan.name, "Unknown feature, allowing");
            true
        }
    }
}

/// Route guard: `from_fn_with_state((state, Feature::X), require_feature)`.
pub async fn require_feature(
    State((state, feature)): State<(AppState, Feature)>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Authentication required")))?;

    let Some((_, plan)) = subscribed_plan(state.store.as_ref(), user.id()).await? else {
        record_feature_check(feature.as_str(), false);
        return Err(AppError::SubscriptionRequired {
            feature: feature.as_str().to_string(),
        });
    };

    if !feature.enabled_in(&plan) {
        record_feature_check(feature.as_str(), false);
        tracing::info!(
            user_id = %user.id(),
            feature = feature.as_str(),
            plan = %plan.name,
            "Feature not in plan"
        );
        return Err(AppError::FeatureUnavailable {
            feature: feature.as_str().to_string(),
            current_plan: plan.name,
        });
    }

    record_feature_check(feature.as_str(), true);
    Ok(next.run(req).await)
}

/// Numeric plan limits checked on create when plan quotas are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    /// Invoices created this calendar month.
    Invoices,
    /// Clients owned, all time.
    Clients,
}

impl Quota {
    pub fn limit(&self, plan: &Plan) -> i32 {
        match self {
            Quota::Invoices => plan.invoice_limit,
            Quota::Clients => plan.client_limit,
        }
    }
}

pub fn within_quota(limit: i32, used: i64) -> bool {
    limit == UNLIMITED || used < i64::from(limit)
}

/// Rejects a create that would exceed the plan's quota. Users without a
/// subscription are not capped here.
pub async fn check_plan_quota(
    state: &AppState,
    user_id: &str,
    quota: Quota,
) -> Result<(), AppError> {
    if !state.config.limits.plan_quotas_enabled {
        return Ok(());
    }

    let Some((_, plan)) = subscribed_plan(state.store.as_ref(), user_id).await? else {
        return Ok(());
    };

    let limit = quota.limit(&plan);
    if limit == UNLIMITED {
        return Ok(());
    }

    let used = match quota {
        Quota::Invoices => {
            state
                .store
                .count_invoices(user_id, Some(month_start(chrono::Utc::now())))
                .await?
        }
        Quota::Clients => state.store.count_clients(user_id, None).await?,
    };

    if within_quota(limit, used) {
        Ok(())
    } else {
        tracing::info!(user_id, ?quota, limit, used, plan = %plan.name, "Plan limit reached");
        Err(AppError::Forbidden(anyhow::anyhow!("Plan limit reached")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_plans;

    fn plan(name: &str) -> Plan {
        default_plans()
            .into_iter()
            .find(|p| p.name == name)
            .unwrap()
    }

    fn plan_with(feature: Feature, enabled: bool) -> Plan {
        let mut plan = plan("Starter");
        match feature {
            Feature::ImageGeneration => plan.image_generation = enabled,
            Feature::CustomVoice => plan.custom_voice = enabled,
            Feature::PrioritySupport => plan.priority_support = enabled,
            Feature::AdvancedAnalytics => plan.advanced_analytics = enabled,
            Feature::ApiAccess => plan.api_access = enabled,
            Feature::WhiteLabel => plan.white_label = enabled,
        }
        plan
    }

    #[test]
    fn every_flag_gates_its_feature() {
        for feature in Feature::ALL {
            assert!(is_feature_allowed(feature.as_str(), &plan_with(feature, true)));
            assert!(!is_feature_allowed(feature.as_str(), &plan_with(feature, false)));
        }
    }

    #[test]
    fn flags_are_independent() {
        let plan = plan_with(Feature::ApiAccess, true);
        for feature in Feature::ALL {
            assert_eq!(feature.enabled_in(&plan), feature == Feature::ApiAccess);
        }
    }

    #[test]
    fn catalog_flags() {
        let starter = plan("Starter");
        let pro = plan("Pro");
        let business = plan("Business");

        assert!(Feature::ALL.iter().all(|f| !f.enabled_in(&starter)));
        assert!(Feature::AdvancedAnalytics.enabled_in(&pro));
        assert!(!Feature::WhiteLabel.enabled_in(&pro));
        assert!(Feature::ALL.iter().all(|f| f.enabled_in(&business)));
    }

    #[test]
    fn unknown_feature_is_allowed() {
        assert!(is_feature_allowed("teleportation", &plan("Starter")));
    }

    #[test]
    fn quotas_follow_plan_limits() {
        let starter = plan("Starter");
        assert_eq!(Quota::Invoices.limit(&starter), 50);
        assert_eq!(Quota::Clients.limit(&starter), 10);
        assert!(within_quota(10, 9));
        assert!(!within_quota(10, 10));
        assert!(within_quota(UNLIMITED, 1_000_000));
    }

    #[test]
    fn names_round_trip() {
        for feature in Feature::ALL {
            assert_eq!(Feature::parse(feature.as_str()), Some(feature));
        }
        assert_eq!(Feature::parse("Image_Generation"), None);
    }
}
