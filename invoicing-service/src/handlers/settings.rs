//! Profile and preference handlers.

use axum::extract::{Json, State};
use service_core::error::AppError;

use crate::dtos::settings::{
    PreferencesResponse, ProfileResponse, UpdatePreferencesRequest, UpdateProfileRequest,
};
use crate::middleware::auth::AuthUser;
use crate::models::{PreferencesInput, User, UserPreferences};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

/// GET /api/settings/profile
pub async fn get_profile(user: AuthUser) -> Json<User> {
    Json(user.0)
}

/// POST /api/settings/profile
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let update = req.into_update()?;

    let updated = state
        .store
        .update_user(user.id(), update)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    tracing::info!(user_id = %updated.id, "Profile updated");

    Ok(Json(ProfileResponse {
        message: "Profile updated successfully".to_string(),
        user: updated,
    }))
}

/// GET /api/settings/preferences
pub async fn get_preferences(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserPreferences>, AppError> {
    let preferences = state
        .store
        .get_preferences(user.id())
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Preferences not found")))?;

    Ok(Json(preferences))
}

/// POST /api/settings/preferences
///
/// Creates the row on first use; fields left out of the body keep their
/// current (or default) value.
pub async fn update_preferences(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<UpdatePreferencesRequest>,
) -> Result<Json<PreferencesResponse>, AppError> {
    let base = state
        .store
        .get_preferences(user.id())
        .await?
        .map(|existing| PreferencesInput::from(&existing))
        .unwrap_or_default();

    let preferences = state
        .store
        .upsert_preferences(user.id(), req.merge_into(base))
        .await?;

    tracing::info!(user_id = %user.id(), "Preferences updated");

    Ok(Json(PreferencesResponse {
        message: "Preferences updated successfully".to_string(),
        preferences,
    }))
}
