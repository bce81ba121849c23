use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Forbidden: {0}")]
    Forbidden(anyhow::Error),

    #[error("Conflict: {0}")]
    Conflict(anyhow::Error),

    #[error("Too many requests: {0}")]
    TooManyRequests(String, Option<u64>),

    /// Hourly request budget exhausted; `reset_time` is a unix timestamp.
    #[error("Rate limit exceeded (limit {limit})")]
    RateLimited { limit: i64, reset_time: i64 },

    #[error("Subscription required for '{feature}'")]
    SubscriptionRequired { feature: String },

    #[error("Feature '{feature}' not available on plan '{current_plan}'")]
    FeatureUnavailable {
        feature: String,
        current_plan: String,
    },

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Service Unavailable")]
    ServiceUnavailable,

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::RowNotFound) {
            return AppError::NotFound(anyhow::anyhow!("Record not found"));
        }

        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return AppError::Conflict(anyhow::anyhow!("{}", db_err.message()));
            }
            if db_err.is_foreign_key_violation() {
                return AppError::BadRequest(anyhow::anyhow!("{}", db_err.message()));
            }
        }

        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_)
            | AppError::SubscriptionRequired { .. }
            | AppError::FeatureUnavailable { .. } => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests(..) | AppError::RateLimited { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            AppError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalError(_) | AppError::DatabaseError(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
            #[serde(flatten)]
            extra: Map<String, Value>,
        }

        let status = self.status_code();
        let mut extra = Map::new();
        let mut retry_after = None;

        let (error_message, details) = match self {
            AppError::ValidationError(err) => {
                ("Validation error".to_string(), Some(err.to_string()))
            }
            AppError::BadRequest(err)
            | AppError::NotFound(err)
            | AppError::Unauthorized(err)
            | AppError::Forbidden(err)
            | AppError::Conflict(err) => (err.to_string(), None),
            AppError::TooManyRequests(msg, retry) => {
                retry_after = retry;
                (msg, None)
            }
            AppError::RateLimited { limit, reset_time } => {
                extra.insert("limit".to_string(), json!(limit));
                extra.insert("reset_time".to_string(), json!(reset_time));
                let now = unix_now();
                retry_after = Some(reset_time.saturating_sub(now).max(0) as u64);
                ("Rate limit exceeded".to_string(), None)
            }
            AppError::SubscriptionRequired { feature } => {
                extra.insert("feature".to_string(), json!(feature));
                ("Subscription required".to_string(), None)
            }
            AppError::FeatureUnavailable {
                feature,
                current_plan,
            } => {
                extra.insert("feature".to_string(), json!(feature));
                extra.insert("current_plan".to_string(), json!(current_plan));
                extra.insert("upgrade_required".to_string(), json!(true));
                ("Feature not available in your plan".to_string(), None)
            }
            AppError::InternalError(err) => {
                tracing::error!(error = ?err, "Internal server error");
                ("Internal server error".to_string(), None)
            }
            AppError::ServiceUnavailable => ("Service unavailable".to_string(), None),
            AppError::DatabaseError(err) => {
                tracing::error!(error = %err, "Database error");
                ("Database error".to_string(), None)
            }
            AppError::ConfigError(err) => {
                ("Configuration error".to_string(), Some(err.to_string()))
            }
        };

        let mut res = (
            status,
            Json(ErrorResponse {
                error: error_message,
                details,
                extra,
            }),
        )
            .into_response();

        if let Some(retry) = retry_after {
            res.headers_mut().insert(header::RETRY_AFTER, retry.into());
        }

        res
    }
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(res: Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn bad_request_renders_error_message() {
        let res = AppError::BadRequest(anyhow::anyhow!("Invalid client selected")).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body = body_json(res).await;
        assert_eq!(body["error"], "Invalid client selected");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn rate_limited_carries_limit_and_reset() {
        let reset_time = unix_now() + 3600;
        let res = AppError::RateLimited {
            limit: 50,
            reset_time,
        }
        .into_response();

        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(res.headers().contains_key(header::RETRY_AFTER));

        let body = body_json(res).await;
        assert_eq!(body["error"], "Rate limit exceeded");
        assert_eq!(body["limit"], 50);
        assert_eq!(body["reset_time"], reset_time);
    }

    #[tokio::test]
    async fn feature_unavailable_flags_upgrade() {
        let res = AppError::FeatureUnavailable {
            feature: "white_label".to_string(),
            current_plan: "Pro".to_string(),
        }
        .into_response();

        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let body = body_json(res).await;
        assert_eq!(body["feature"], "white_label");
        assert_eq!(body["current_plan"], "Pro");
        assert_eq!(body["upgrade_required"], true);
    }

    #[tokio::test]
    async fn subscription_required_names_feature() {
        let res = AppError::SubscriptionRequired {
            feature: "advanced_analytics".to_string(),
        }
        .into_response();

        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let body = body_json(res).await;
        assert_eq!(body["error"], "Subscription required");
        assert_eq!(body["feature"], "advanced_analytics");
    }

    #[tokio::test]
    async fn database_errors_hide_internals() {
        let res = AppError::DatabaseError(anyhow::anyhow!("connection refused")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(res).await;
        assert_eq!(body["error"], "Database error");
        assert!(body.get("details").is_none());
    }

    #[test]
    fn row_not_found_maps_to_404() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
