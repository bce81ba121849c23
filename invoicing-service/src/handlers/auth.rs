//! Identity sync endpoints. These run without the auth middleware: they are
//! how users come to exist in the first place.

use axum::{
    body::Bytes,
    extract::{Json, State},
};
use service_core::error::AppError;

use crate::dtos::auth::{SyncUserRequest, SyncUserResponse, WebhookEvent};
use crate::dtos::MessageResponse;
use crate::models::{CreateUser, PreferencesInput, UpdateUser, UpsertSubscription, User};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

const USER_CREATED: &str = "user.created";
const USER_UPDATED: &str = "user.updated";
const USER_DELETED: &str = "user.deleted";

fn bad_request(message: &'static str) -> AppError {
    AppError::BadRequest(anyhow::anyhow!(message))
}

/// Gives a new user a Starter trial and default preferences. Failures are
/// logged; the user is kept either way.
async fn provision_new_user(state: &AppState, user: &User) {
    let trial = UpsertSubscription::starter_trial(&user.id, state.config.limits.trial_days);
    match state.store.upsert_subscription(trial).await {
        Ok(sub) => {
            tracing::info!(user_id = %user.id, subscription_id = %sub.id, "Trial subscription created")
        }
        Err(e) => {
            tracing::error!(error = %e, user_id = %user.id, "Failed to create trial subscription")
        }
    }

    if let Err(e) = state
        .store
        .upsert_preferences(&user.id, PreferencesInput::default())
        .await
    {
        tracing::error!(error = %e, user_id = %user.id, "Failed to create default preferences");
    }
}

/// POST /api/auth/sync-user
///
/// Creates or refreshes the user identified by `clerk_id`.
pub async fn sync_user(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SyncUserRequest>,
) -> Result<Json<SyncUserResponse>, AppError> {
    let clerk_id = req.clerk_id.trim();
    if clerk_id.is_empty() {
        return Err(bad_request("Clerk ID is required"));
    }
    let email = req.email.trim();
    if email.is_empty() {
        return Err(bad_request("Email is required"));
    }

    if let Some(existing) = state.store.get_user_by_clerk_id(clerk_id).await? {
        let user = state
            .store
            .update_user(
                &existing.id,
                UpdateUser {
                    email: Some(email.to_string()),
                    display_name: Some(req.display_name),
                    profile_image: Some(req.profile_image),
                },
            )
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

        tracing::info!(user_id = %user.id, "User synced");

        return Ok(Json(SyncUserResponse {
            message: "User updated successfully".to_string(),
            user,
            is_new: false,
        }));
    }

    let user = state
        .store
        .create_user(CreateUser {
            clerk_id: Some(clerk_id.to_string()),
            email: email.to_string(),
            display_name: req.display_name,
            profile_image: req.profile_image,
        })
        .await?;

    tracing::info!(user_id = %user.id, "User created");
    provision_new_user(&state, &user).await;

    Ok(Json(SyncUserResponse {
        message: "User created successfully".to_string(),
        user,
        is_new: true,
    }))
}

/// POST /api/auth/webhook
///
/// Identity provider user lifecycle events. Signatures are not verified.
pub async fn webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MessageResponse>, AppError> {
    let event: WebhookEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected webhook body");
        bad_request("Invalid webhook data")
    })?;
    let data = &event.data;

    tracing::info!(event_type = %event.event_type, clerk_id = %data.id, "Webhook received");

    match event.event_type.as_str() {
        USER_CREATED => {
            if state.store.get_user_by_clerk_id(&data.id).await?.is_some() {
                tracing::info!(clerk_id = %data.id, "User already exists, skipping create");
            } else {
                let user = state
                    .store
                    .create_user(CreateUser {
                        clerk_id: Some(data.id.clone()),
                        email: data.email(),
                        display_name: data.display_name(),
                        profile_image: data.profile_image(),
                    })
                    .await?;
                tracing::info!(user_id = %user.id, "User created from webhook");
                provision_new_user(&state, &user).await;
            }
        }
        USER_UPDATED => {
            let existing = state
                .store
                .get_user_by_clerk_id(&data.id)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

            let email = data.email();
            state
                .store
                .update_user(
                    &existing.id,
                    UpdateUser {
                        email: (!email.is_empty()).then_some(email),
                        display_name: Some(data.display_name()),
                        profile_image: Some(data.profile_image()),
                    },
                )
                .await?;
            tracing::info!(user_id = %existing.id, "User updated from webhook");
        }
        USER_DELETED => {
            if state.store.delete_user_by_clerk_id(&data.id).await? {
                tracing::info!(clerk_id = %data.id, "User deleted from webhook");
            } else {
                tracing::debug!(clerk_id = %data.id, "Deleted user was not known");
            }
        }
        other => {
            tracing::debug!(event_type = other, "Ignoring webhook event");
        }
    }

    Ok(Json(MessageResponse::new("Webhook processed successfully")))
}
