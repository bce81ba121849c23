use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserPreferences {
    pub id: String,
    pub user_id: String,
    pub theme: String,
    pub language: String,
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub marketing_emails: bool,
    pub weekly_reports: bool,
    pub security_alerts: bool,
    pub currency: String,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full set of preference values written by an upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferencesInput {
    pub theme: String,
    pub language: String,
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub marketing_emails: bool,
    pub weekly_reports: bool,
    pub security_alerts: bool,
    pub currency: String,
    pub timezone: String,
}

impl Default for PreferencesInput {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            language: "en".to_string(),
            email_notifications: true,
            push_notifications: true,
            marketing_emails: false,
            weekly_reports: true,
            security_alerts: true,
            currency: "USD".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

impl From<&UserPreferences> for PreferencesInput {
    fn from(p: &UserPreferences) -> Self {
        Self {
            theme: p.theme.clone(),
            language: p.language.clone(),
            email_notifications: p.email_notifications,
            push_notifications: p.push_notifications,
            marketing_emails: p.marketing_emails,
            weekly_reports: p.weekly_reports,
            security_alerts: p.security_alerts,
            currency: p.currency.clone(),
            timezone: p.timezone.clone(),
        }
    }
}
