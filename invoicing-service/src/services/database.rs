//! Database service for invoicing-service.

use super::store::Store;
use crate::ids::{self, IdKind};
use crate::models::{
    ActivityDelta, AnalyticsData, Client, ClientStats, CreateClient, CreateInvoice,
    CreateUsageLog, CreateUser, Invoice, ListInvoicesFilter, Plan, PreferencesInput,
    Subscription, UpdateClient, UpdateInvoice, UpdateUser, UpsertSubscription, UsageLog, User,
    UserPreferences,
};
use crate::services::metrics::DB_QUERY_DURATION;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

const USER_COLUMNS: &str =
    "id, clerk_id, email, display_name, profile_image, created_at, updated_at";

const PLAN_COLUMNS: &str = r#"id, name, price, currency, "interval", invoice_limit, client_limit,
    messages_per_day, image_generation, custom_voice, priority_support, advanced_analytics,
    api_access, white_label, created_at, updated_at"#;

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, plan_id, status, current_period_end, trial_end, \
    canceled_at, created_at, updated_at";

const PREFERENCES_COLUMNS: &str = "id, user_id, theme, language, email_notifications, \
    push_notifications, marketing_emails, weekly_reports, security_alerts, currency, timezone, \
    created_at, updated_at";

const CLIENT_COLUMNS: &str = "id, user_id, name, email, avatar, payment_delay, total_invoiced, \
    total_paid, invoice_count, average_invoice, created_at, updated_at";

const INVOICE_COLUMNS: &str = "id, user_id, client_id, client_name, invoice_date, due_date, \
    amount, currency_type, status, created_at, updated_at";

const USAGE_COLUMNS: &str = "id, user_id, feature_type, count, metadata, timestamp";

const ANALYTICS_COLUMNS: &str = "id, user_id, date, invoices_created, clients_added, \
    revenue_generated, messages_count, created_at";

/// Maps constraint violations to client errors, everything else to `DatabaseError`.
fn db_error(action: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(anyhow::anyhow!("Failed to {}: {}", action, db_err.message()))
        }
        sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
            AppError::BadRequest(anyhow::anyhow!("Failed to {}: {}", action, db_err.message()))
        }
        _ => AppError::DatabaseError(anyhow::anyhow!("Failed to {}: {}", action, e)),
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "invoicing-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Wrap an existing pool (used by tests that prepare their own schema).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl Store for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // User Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(email = %input.email))]
    async fn create_user(&self, input: CreateUser) -> Result<User, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_user"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, clerk_id, email, display_name, profile_image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(ids::generate(IdKind::User))
        .bind(&input.clerk_id)
        .bind(&input.email)
        .bind(&input.display_name)
        .bind(&input.profile_image)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create user"))?;

        timer.observe_duration();

        info!(user_id = %user.id, "User created");

        Ok(user)
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_user"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get user: {}", e)))?;

        timer.observe_duration();

        Ok(user)
    }

    #[instrument(skip(self))]
    async fn get_user_by_clerk_id(&self, clerk_id: &str) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_user_by_clerk_id"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE clerk_id = $1"
        ))
        .bind(clerk_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get user: {}", e)))?;

        timer.observe_duration();

        Ok(user)
    }

    #[instrument(skip(self, update))]
    async fn update_user(
        &self,
        user_id: &str,
        update: UpdateUser,
    ) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_user"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                display_name = COALESCE($3, display_name),
                profile_image = COALESCE($4, profile_image),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&update.email)
        .bind(&update.display_name)
        .bind(&update.profile_image)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update user"))?;

        timer.observe_duration();

        Ok(user)
    }

    #[instrument(skip(self))]
    async fn delete_user_by_clerk_id(&self, clerk_id: &str) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_user"])
            .start_timer();

        let result = sqlx::query("DELETE FROM users WHERE clerk_id = $1")
            .bind(clerk_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete user: {}", e)))?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Plan Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, plan), fields(plan_id = %plan.id))]
    async fn upsert_plan(&self, plan: &Plan) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_plan"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO plans (id, name, price, currency, "interval", invoice_limit, client_limit,
                messages_per_day, image_generation, custom_voice, priority_support,
                advanced_analytics, api_access, white_label)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                price = EXCLUDED.price,
                currency = EXCLUDED.currency,
                "interval" = EXCLUDED."interval",
                invoice_limit = EXCLUDED.invoice_limit,
                client_limit = EXCLUDED.client_limit,
                messages_per_day = EXCLUDED.messages_per_day,
                image_generation = EXCLUDED.image_generation,
                custom_voice = EXCLUDED.custom_voice,
                priority_support = EXCLUDED.priority_support,
                advanced_analytics = EXCLUDED.advanced_analytics,
                api_access = EXCLUDED.api_access,
                white_label = EXCLUDED.white_label,
                updated_at = NOW()
            "#,
        )
        .bind(&plan.id)
        .bind(&plan.name)
        .bind(plan.price)
        .bind(&plan.currency)
        .bind(&plan.interval)
        .bind(plan.invoice_limit)
        .bind(plan.client_limit)
        .bind(plan.messages_per_day)
        .bind(plan.image_generation)
        .bind(plan.custom_voice)
        .bind(plan.priority_support)
        .bind(plan.advanced_analytics)
        .bind(plan.api_access)
        .bind(plan.white_label)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to upsert plan: {}", e)))?;

        timer.observe_duration();

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_plans(&self) -> Result<Vec<Plan>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_plans"])
            .start_timer();

        let plans = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans ORDER BY price, id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list plans: {}", e)))?;

        timer.observe_duration();

        Ok(plans)
    }

    #[instrument(skip(self))]
    async fn get_plan(&self, plan_id: &str) -> Result<Option<Plan>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_plan"])
            .start_timer();

        let plan = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE id = $1"
        ))
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get plan: {}", e)))?;

        timer.observe_duration();

        Ok(plan)
    }

    // -------------------------------------------------------------------------
    // Subscription Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn get_subscription(&self, user_id: &str) -> Result<Option<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_subscription"])
            .start_timer();

        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get subscription: {}", e))
        })?;

        timer.observe_duration();

        Ok(subscription)
    }

    #[instrument(skip(self, input), fields(user_id = %input.user_id, plan_id = %input.plan_id))]
    async fn upsert_subscription(
        &self,
        input: UpsertSubscription,
    ) -> Result<Subscription, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_subscription"])
            .start_timer();

        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            r#"
            INSERT INTO subscriptions (id, user_id, plan_id, status, current_period_end, trial_end, canceled_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE
            SET plan_id = EXCLUDED.plan_id,
                status = EXCLUDED.status,
                current_period_end = EXCLUDED.current_period_end,
                trial_end = EXCLUDED.trial_end,
                canceled_at = EXCLUDED.canceled_at,
                updated_at = NOW()
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(ids::generate(IdKind::Subscription))
        .bind(&input.user_id)
        .bind(&input.plan_id)
        .bind(input.status.as_str())
        .bind(input.current_period_end)
        .bind(input.trial_end)
        .bind(input.canceled_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("save subscription"))?;

        timer.observe_duration();

        info!(subscription_id = %subscription.id, status = %subscription.status, "Subscription saved");

        Ok(subscription)
    }

    // -------------------------------------------------------------------------
    // Preference Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn get_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_preferences"])
            .start_timer();

        let preferences = sqlx::query_as::<_, UserPreferences>(&format!(
            "SELECT {PREFERENCES_COLUMNS} FROM user_preferences WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get preferences: {}", e)))?;

        timer.observe_duration();

        Ok(preferences)
    }

    #[instrument(skip(self, input))]
    async fn upsert_preferences(
        &self,
        user_id: &str,
        input: PreferencesInput,
    ) -> Result<UserPreferences, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_preferences"])
            .start_timer();

        let preferences = sqlx::query_as::<_, UserPreferences>(&format!(
            r#"
            INSERT INTO user_preferences (id, user_id, theme, language, email_notifications,
                push_notifications, marketing_emails, weekly_reports, security_alerts, currency, timezone)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (user_id) DO UPDATE
            SET theme = EXCLUDED.theme,
                language = EXCLUDED.language,
                email_notifications = EXCLUDED.email_notifications,
                push_notifications = EXCLUDED.push_notifications,
                marketing_emails = EXCLUDED.marketing_emails,
                weekly_reports = EXCLUDED.weekly_reports,
                security_alerts = EXCLUDED.security_alerts,
                currency = EXCLUDED.currency,
                timezone = EXCLUDED.timezone,
                updated_at = NOW()
            RETURNING {PREFERENCES_COLUMNS}
            "#
        ))
        .bind(ids::generate(IdKind::Preferences))
        .bind(user_id)
        .bind(&input.theme)
        .bind(&input.language)
        .bind(input.email_notifications)
        .bind(input.push_notifications)
        .bind(input.marketing_emails)
        .bind(input.weekly_reports)
        .bind(input.security_alerts)
        .bind(&input.currency)
        .bind(&input.timezone)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("save preferences"))?;

        timer.observe_duration();

        Ok(preferences)
    }

    // -------------------------------------------------------------------------
    // Client Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    async fn create_client(&self, input: CreateClient) -> Result<Client, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            INSERT INTO clients (id, user_id, name, email, avatar, payment_delay)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(ids::generate(IdKind::Client))
        .bind(&input.user_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.avatar)
        .bind(input.payment_delay)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create client"))?;

        timer.observe_duration();

        info!(client_id = %client.id, "Client created");

        Ok(client)
    }

    #[instrument(skip(self))]
    async fn list_clients(
        &self,
        user_id: &str,
        search: Option<&str>,
    ) -> Result<Vec<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_clients"])
            .start_timer();

        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let clients = sqlx::query_as::<_, Client>(&format!(
            r#"
            SELECT {CLIENT_COLUMNS}
            FROM clients
            WHERE user_id = $1
              AND ($2::text IS NULL OR name ILIKE $2 OR email ILIKE $2)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list clients: {}", e)))?;

        timer.observe_duration();

        Ok(clients)
    }

    #[instrument(skip(self))]
    async fn get_client(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1 AND user_id = $2"
        ))
        .bind(client_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get client: {}", e)))?;

        timer.observe_duration();

        Ok(client)
    }

    #[instrument(skip(self))]
    async fn find_client_by_name(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_client_by_name"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            SELECT {CLIENT_COLUMNS}
            FROM clients
            WHERE user_id = $1 AND name = $2
            ORDER BY created_at, id
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find client: {}", e)))?;

        timer.observe_duration();

        Ok(client)
    }

    #[instrument(skip(self, update))]
    async fn update_client(
        &self,
        user_id: &str,
        client_id: &str,
        update: UpdateClient,
    ) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            UPDATE clients
            SET name = COALESCE($3, name),
                email = COALESCE($4, email),
                avatar = COALESCE($5, avatar),
                payment_delay = COALESCE($6, payment_delay),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(client_id)
        .bind(user_id)
        .bind(&update.name)
        .bind(&update.email)
        .bind(&update.avatar)
        .bind(update.payment_delay)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update client: {}", e)))?;

        if let (Some(client), Some(_)) = (&client, &update.name) {
            sqlx::query(
                "UPDATE invoices SET client_name = $2, updated_at = NOW() WHERE client_id = $1",
            )
            .bind(&client.id)
            .bind(&client.name)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to refresh invoice client names: {}",
                    e
                ))
            })?;
        }

        timer.observe_duration();

        Ok(client)
    }

    #[instrument(skip(self))]
    async fn delete_client(&self, user_id: &str, client_id: &str) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_client"])
            .start_timer();

        let result = sqlx::query("DELETE FROM clients WHERE id = $1 AND user_id = $2")
            .bind(client_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    AppError::BadRequest(anyhow::anyhow!(
                        "Cannot delete client with existing invoices"
                    ))
                }
                _ => AppError::DatabaseError(anyhow::anyhow!("Failed to delete client: {}", e)),
            })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, stats))]
    async fn update_client_stats(
        &self,
        user_id: &str,
        client_id: &str,
        stats: &ClientStats,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_client_stats"])
            .start_timer();

        sqlx::query(
            r#"
            UPDATE clients
            SET total_invoiced = $3,
                total_paid = $4,
                invoice_count = $5,
                average_invoice = $6
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(client_id)
        .bind(user_id)
        .bind(stats.total_invoiced)
        .bind(stats.total_paid)
        .bind(stats.invoice_count)
        .bind(stats.average_invoice)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update client stats: {}", e))
        })?;

        timer.observe_duration();

        Ok(())
    }

    #[instrument(skip(self))]
    async fn count_clients(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["count_clients"])
            .start_timer();

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM clients
            WHERE user_id = $1 AND ($2::timestamptz IS NULL OR created_at >= $2)
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to count clients: {}", e)))?;

        timer.observe_duration();

        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(user_id = %input.user_id, client_id = %input.client_id))]
    async fn create_invoice(&self, input: CreateInvoice) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (id, user_id, client_id, client_name, invoice_date, due_date,
                amount, currency_type, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(ids::generate(IdKind::Invoice))
        .bind(&input.user_id)
        .bind(&input.client_id)
        .bind(&input.client_name)
        .bind(&input.invoice_date)
        .bind(&input.due_date)
        .bind(input.amount)
        .bind(&input.currency_type)
        .bind(input.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create invoice"))?;

        timer.observe_duration();

        info!(invoice_id = %invoice.id, "Invoice created");

        Ok(invoice)
    }

    #[instrument(skip(self, filter))]
    async fn list_invoices(
        &self,
        user_id: &str,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE user_id = $1
              AND ($2::text IS NULL OR client_id = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
            ORDER BY created_at DESC, id DESC
            LIMIT $5
            "#
        ))
        .bind(user_id)
        .bind(&filter.client_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.created_since)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        Ok(invoices)
    }

    #[instrument(skip(self))]
    async fn get_invoice(
        &self,
        user_id: &str,
        invoice_id: &str,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1 AND user_id = $2"
        ))
        .bind(invoice_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    #[instrument(skip(self, update))]
    async fn update_invoice(
        &self,
        user_id: &str,
        invoice_id: &str,
        update: UpdateInvoice,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET client_id = COALESCE($3, client_id),
                client_name = COALESCE($4, client_name),
                invoice_date = COALESCE($5, invoice_date),
                due_date = COALESCE($6, due_date),
                amount = COALESCE($7, amount),
                currency_type = COALESCE($8, currency_type),
                status = COALESCE($9, status),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(invoice_id)
        .bind(user_id)
        .bind(&update.client_id)
        .bind(&update.client_name)
        .bind(&update.invoice_date)
        .bind(&update.due_date)
        .bind(update.amount)
        .bind(&update.currency_type)
        .bind(update.status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update invoice"))?;

        timer.observe_duration();

        Ok(invoice)
    }

    #[instrument(skip(self))]
    async fn delete_invoice(&self, user_id: &str, invoice_id: &str) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_invoice"])
            .start_timer();

        let result = sqlx::query("DELETE FROM invoices WHERE id = $1 AND user_id = $2")
            .bind(invoice_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete invoice: {}", e))
            })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn count_invoices(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["count_invoices"])
            .start_timer();

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM invoices
            WHERE user_id = $1 AND ($2::timestamptz IS NULL OR created_at >= $2)
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to count invoices: {}", e)))?;

        timer.observe_duration();

        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Usage Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(user_id = %input.user_id, feature_type = %input.feature_type))]
    async fn record_usage(&self, input: CreateUsageLog) -> Result<UsageLog, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_usage"])
            .start_timer();

        let log = sqlx::query_as::<_, UsageLog>(&format!(
            r#"
            INSERT INTO usage_logs (id, user_id, feature_type, count, metadata)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USAGE_COLUMNS}
            "#
        ))
        .bind(ids::generate(IdKind::UsageLog))
        .bind(&input.user_id)
        .bind(&input.feature_type)
        .bind(input.count)
        .bind(&input.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("record usage"))?;

        timer.observe_duration();

        Ok(log)
    }

    #[instrument(skip(self))]
    async fn count_usage(
        &self,
        user_id: &str,
        feature_type: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["count_usage"])
            .start_timer();

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM usage_logs
            WHERE user_id = $1 AND feature_type = $2 AND timestamp >= $3
            "#,
        )
        .bind(user_id)
        .bind(feature_type)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to count usage: {}", e)))?;

        timer.observe_duration();

        Ok(count)
    }

    #[instrument(skip(self))]
    async fn list_usage(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<UsageLog>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_usage"])
            .start_timer();

        let logs = sqlx::query_as::<_, UsageLog>(&format!(
            r#"
            SELECT {USAGE_COLUMNS}
            FROM usage_logs
            WHERE user_id = $1 AND timestamp >= $2
            ORDER BY timestamp, id
            "#
        ))
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list usage: {}", e)))?;

        timer.observe_duration();

        Ok(logs)
    }

    // -------------------------------------------------------------------------
    // Analytics Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, delta))]
    async fn record_daily_activity(
        &self,
        user_id: &str,
        date: NaiveDate,
        delta: &ActivityDelta,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_daily_activity"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO analytics_data (id, user_id, date, invoices_created, clients_added,
                revenue_generated, messages_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, date) DO UPDATE
            SET invoices_created = analytics_data.invoices_created + EXCLUDED.invoices_created,
                clients_added = analytics_data.clients_added + EXCLUDED.clients_added,
                revenue_generated = analytics_data.revenue_generated + EXCLUDED.revenue_generated,
                messages_count = analytics_data.messages_count + EXCLUDED.messages_count
            "#,
        )
        .bind(ids::generate(IdKind::Analytics))
        .bind(user_id)
        .bind(date)
        .bind(delta.invoices_created)
        .bind(delta.clients_added)
        .bind(delta.revenue_generated)
        .bind(delta.messages_count)
        .execute(&self.pool)
        .await
        .map_err(db_error("record daily activity"))?;

        timer.observe_duration();

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_analytics(
        &self,
        user_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<AnalyticsData>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_analytics"])
            .start_timer();

        let rows = sqlx::query_as::<_, AnalyticsData>(&format!(
            r#"
            SELECT {ANALYTICS_COLUMNS}
            FROM analytics_data
            WHERE user_id = $1 AND date >= $2
            ORDER BY date ASC
            "#
        ))
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list analytics data: {}", e))
        })?;

        timer.observe_duration();

        Ok(rows)
    }
}
