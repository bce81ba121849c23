use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account holder. Every other record is owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub clerk_id: Option<String>,
    pub email: String,
    pub display_name: String,
    pub profile_image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub clerk_id: Option<String>,
    pub email: String,
    pub display_name: String,
    pub profile_image: String,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub profile_image: Option<String>,
}

impl User {
    pub fn apply(&mut self, update: &UpdateUser) {
        if let Some(email) = &update.email {
            self.email = email.clone();
        }
        if let Some(display_name) = &update.display_name {
            self.display_name = display_name.clone();
        }
        if let Some(profile_image) = &update.profile_image {
            self.profile_image = profile_image.clone();
        }
    }
}
