use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

use crate::models::{PreferencesInput, UpdateUser, User, UserPreferences};

/// Empty fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub profile_image: String,
}

impl UpdateProfileRequest {
    pub fn into_update(self) -> Result<UpdateUser, AppError> {
        let email = self.email.trim().to_string();
        if !email.is_empty() && (email.len() < 5 || !email.contains('@')) {
            return Err(AppError::BadRequest(anyhow::anyhow!("Invalid email format")));
        }

        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
        Ok(UpdateUser {
            email: non_empty(email),
            display_name: non_empty(self.display_name),
            profile_image: non_empty(self.profile_image),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub message: String,
    pub user: User,
}

/// Empty strings and missing flags keep the current value (or the default
/// when the user has no preferences yet).
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePreferencesRequest {
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub language: String,
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
    pub marketing_emails: Option<bool>,
    pub weekly_reports: Option<bool>,
    pub security_alerts: Option<bool>,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub timezone: String,
}

impl UpdatePreferencesRequest {
    pub fn merge_into(self, mut base: PreferencesInput) -> PreferencesInput {
        let set = |target: &mut String, value: String| {
            if !value.trim().is_empty() {
                *target = value;
            }
        };
        set(&mut base.theme, self.theme);
        set(&mut base.language, self.language);
        set(&mut base.currency, self.currency);
        set(&mut base.timezone, self.timezone);

        if let Some(v) = self.email_notifications {
            base.email_notifications = v;
        }
        if let Some(v) = self.push_notifications {
            base.push_notifications = v;
        }
        if let Some(v) = self.marketing_emails {
            base.marketing_emails = v;
        }
        if let Some(v) = self.weekly_reports {
            base.weekly_reports = v;
        }
        if let Some(v) = self.security_alerts {
            base.security_alerts = v;
        }
        base
    }
}

#[derive(Debug, Serialize)]
pub struct PreferencesResponse {
    pub message: String,
    pub preferences: UserPreferences,
}
