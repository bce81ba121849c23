//! Application startup and lifecycle management.

use crate::config::{InvoicingConfig, StorageBackend};
use crate::handlers::{analytics, auth, clients, dashboard, invoices, settings, subscription};
use crate::middleware::{auth_middleware, rate_limit_middleware, require_feature, Feature};
use crate::models::default_plans;
use crate::services::{get_metrics, init_metrics, Database, MemoryStore, Store, UsageTracker};
use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::security_headers::security_headers_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub usage: UsageTracker,
    pub config: Arc<InvoicingConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: InvoicingConfig) -> Self {
        let usage = UsageTracker::new(store.clone(), config.limits.usage_tracking_enabled);
        Self {
            store,
            usage,
            config: Arc::new(config),
        }
    }
}

/// Health check endpoint for Docker/K8s liveness probes.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(_) => {
            tracing::debug!("Health check passed");
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ok",
                    "service": state.config.service_name,
                    "version": state.config.service_version,
                })),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed - store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": state.config.service_name,
                    "error": e.to_string()
                })),
            )
        }
    }
}

/// Readiness check endpoint for K8s readiness probes.
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Metrics endpoint for Prometheus scraping.
async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

fn cors_layer(config: &InvoicingConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-user-id"),
            HeaderName::from_static("x-clerk-id"),
        ])
        .expose_headers([
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderName::from_static("x-ratelimit-remaining"),
            HeaderName::from_static("x-ratelimit-reset"),
            HeaderName::from_static("x-request-id"),
        ])
}

/// The full HTTP surface.
///
/// `/api/auth/*` is public. Every other `/api` route runs the auth guard,
/// then the rate limiter; analytics routes are further gated on the
/// `advanced_analytics` plan feature.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/auth/sync-user", post(auth::sync_user))
        .route("/api/auth/webhook", post(auth::webhook));

    let analytics = Router::new()
        .route("/api/analytics/usage", get(analytics::usage_analytics))
        .route("/api/analytics/dashboard", get(analytics::analytics_dashboard))
        .route_layer(from_fn_with_state(
            (state.clone(), Feature::AdvancedAnalytics),
            require_feature,
        ));

    let protected = Router::new()
        .route(
            "/api/clients",
            get(clients::list_clients).post(clients::create_client),
        )
        .route(
            "/api/clients/:id",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route(
            "/api/clients/:id/revenue-data",
            get(clients::client_revenue_data),
        )
        .route(
            "/api/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route(
            "/api/invoices/:id",
            get(invoices::get_invoice)
                .put(invoices::update_invoice)
                .delete(invoices::delete_invoice),
        )
        .route("/api/dashboard/kpi", get(dashboard::kpi))
        .route("/api/dashboard/revenue-chart", get(dashboard::revenue_chart))
        .route("/api/dashboard/top-clients", get(dashboard::top_clients))
        .route(
            "/api/dashboard/recent-invoices",
            get(dashboard::recent_invoices),
        )
        .route(
            "/api/dashboard/reports-summary",
            get(dashboard::reports_summary),
        )
        .route(
            "/api/dashboard/collection-rate",
            get(dashboard::collection_rate),
        )
        .route(
            "/api/dashboard/top-revenue-month",
            get(dashboard::top_revenue_month),
        )
        .route(
            "/api/dashboard/primary-currency",
            get(dashboard::primary_currency),
        )
        .route(
            "/api/settings/profile",
            get(settings::get_profile).post(settings::update_profile),
        )
        .route(
            "/api/settings/preferences",
            get(settings::get_preferences).post(settings::update_preferences),
        )
        .route(
            "/api/subscription/status",
            get(subscription::subscription_status),
        )
        .route(
            "/api/subscription/change",
            post(subscription::change_subscription),
        )
        .route(
            "/api/subscription/cancel",
            post(subscription::cancel_subscription),
        )
        .route(
            "/api/subscription/usage",
            get(subscription::subscription_usage),
        )
        .route("/api/subscription/plans", get(subscription::list_plans))
        .route(
            "/api/subscription/features/:feature",
            get(subscription::check_feature),
        )
        .merge(analytics)
        // Added first, so it runs after auth
        .route_layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let cors = cors_layer(&state.config);
    let timeout = state.config.common.request_timeout();

    Router::new()
        .merge(public)
        .merge(protected)
        .with_state(state)
        .layer(TimeoutLayer::new(timeout))
        // Add metrics middleware
        .layer(from_fn(metrics_middleware))
        // Add tracing layer
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                    user_id = tracing::field::Empty,
                )
            }),
        )
        // Add tracing middleware for request_id
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}

/// Writes the plan catalog; existing plans are overwritten with the
/// catalog values.
async fn seed_plans(store: &dyn Store) -> Result<(), AppError> {
    for plan in default_plans() {
        store.upsert_plan(&plan).await?;
    }
    tracing::info!("Plan catalog seeded");
    Ok(())
}

async fn connect_store(config: &InvoicingConfig) -> Result<Arc<dyn Store>, AppError> {
    match config.storage {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            let database = config.database.as_ref().ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
            })?;

            let db = Database::new(
                &database.url,
                database.max_connections,
                database.min_connections,
            )
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                e
            })?;

            db.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;

            Ok(Arc::new(db))
        }
    }
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: InvoicingConfig) -> Result<Self, AppError> {
        let store = connect_store(&config).await?;
        Self::build_with_store(config, store).await
    }

    /// Build on an already prepared store.
    pub async fn build_with_store(
        config: InvoicingConfig,
        store: Arc<dyn Store>,
    ) -> Result<Self, AppError> {
        init_metrics();

        seed_plans(store.as_ref()).await?;

        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = listener.local_addr()?.port();

        tracing::info!(http_port, storage = ?config.storage, "Invoicing service listener bound");

        Ok(Self {
            http_port,
            listener,
            state: AppState::new(store, config),
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// The store behind the running application.
    pub fn store(&self) -> Arc<dyn Store> {
        self.state.store.clone()
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let app = router(self.state.clone());

        tracing::info!(
            service = %self.state.config.service_name,
            version = %self.state.config.service_version,
            http_port = self.http_port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, app).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
