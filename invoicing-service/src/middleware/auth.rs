//! Header-based authentication.
//!
//! Callers identify themselves with `X-Clerk-ID` (external identity) or
//! `X-User-ID` (internal id). No tokens are verified.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::models::User;
use crate::startup::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const CLERK_ID_HEADER: &str = "x-clerk-id";

fn header_value<'a>(req: &'a Request, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Resolves the caller and stores the [`User`] in request extensions.
///
/// `X-Clerk-ID` is tried first; `X-User-ID` is the fallback.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let clerk_id = header_value(&req, CLERK_ID_HEADER).map(str::to_string);
    let user_id = header_value(&req, USER_ID_HEADER).map(str::to_string);

    if clerk_id.is_none() && user_id.is_none() {
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Authentication required"
        )));
    }

    let mut user = None;
    if let Some(clerk_id) = &clerk_id {
        user = state.store.get_user_by_clerk_id(clerk_id).await?;
    }
    if user.is_none() {
        if let Some(user_id) = &user_id {
            user = state.store.get_user(user_id).await?;
        }
    }

    let Some(user) = user else {
        tracing::debug!(?clerk_id, ?user_id, "Unknown caller");
        return Err(AppError::Unauthorized(anyhow::anyhow!("User not found")));
    };

    req.extensions_mut().insert(AuthUser(user));

    Ok(next.run(req).await)
}

/// The authenticated caller, placed by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Authentication required")))?;

        tracing::Span::current().record("user_id", user.id());

        Ok(user)
    }
}
