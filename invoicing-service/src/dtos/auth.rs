use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::User;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct SyncUserRequest {
    #[serde(default)]
    pub clerk_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub profile_image: String,
}

#[derive(Debug, Serialize)]
pub struct SyncUserResponse {
    pub message: String,
    pub user: User,
    pub is_new: bool,
}

/// Identity provider event, e.g. `{"type": "user.created", "data": {...}}`.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookUser,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookUser {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<WebhookEmail>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEmail {
    #[serde(default)]
    pub id: String,
    pub email_address: String,
}

impl WebhookUser {
    /// The primary address when flagged, otherwise the first listed.
    pub fn email(&self) -> String {
        self.primary_email_address_id
            .as_deref()
            .and_then(|primary| self.email_addresses.iter().find(|e| e.id == primary))
            .or_else(|| self.email_addresses.first())
            .map(|e| e.email_address.clone())
            .unwrap_or_default()
    }

    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }

    pub fn profile_image(&self) -> String {
        self.image_url.clone().unwrap_or_default()
    }
}
