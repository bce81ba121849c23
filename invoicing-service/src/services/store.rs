//! Persistence seam. [`Database`](super::Database) backs it with PostgreSQL,
//! [`MemoryStore`](super::MemoryStore) with in-process tables.
//!
//! Operations that take a `user_id` only ever see that user's rows. Writes
//! are independent statements; callers doing check-then-act sequences
//! (ownership checks, rate limiting) accept that concurrent requests may
//! interleave.

use crate::models::{
    ActivityDelta, AnalyticsData, Client, ClientStats, CreateClient, CreateInvoice,
    CreateUsageLog, CreateUser, Invoice, ListInvoicesFilter, Plan, PreferencesInput,
    Subscription, UpdateClient, UpdateInvoice, UpdateUser, UpsertSubscription, UsageLog, User,
    UserPreferences,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use service_core::error::AppError;

#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    // Users

    /// Fails with `Conflict` when the email or external id is taken.
    async fn create_user(&self, input: CreateUser) -> Result<User, AppError>;
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError>;
    async fn get_user_by_clerk_id(&self, clerk_id: &str) -> Result<Option<User>, AppError>;
    async fn update_user(
        &self,
        user_id: &str,
        update: UpdateUser,
    ) -> Result<Option<User>, AppError>;
    /// Removes the user and everything they own. Returns whether a user existed.
    async fn delete_user_by_clerk_id(&self, clerk_id: &str) -> Result<bool, AppError>;

    // Plans

    async fn upsert_plan(&self, plan: &Plan) -> Result<(), AppError>;
    async fn list_plans(&self) -> Result<Vec<Plan>, AppError>;
    async fn get_plan(&self, plan_id: &str) -> Result<Option<Plan>, AppError>;

    // Subscriptions

    async fn get_subscription(&self, user_id: &str) -> Result<Option<Subscription>, AppError>;
    async fn upsert_subscription(
        &self,
        input: UpsertSubscription,
    ) -> Result<Subscription, AppError>;

    // Preferences

    async fn get_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>, AppError>;
    async fn upsert_preferences(
        &self,
        user_id: &str,
        input: PreferencesInput,
    ) -> Result<UserPreferences, AppError>;

    // Clients

    async fn create_client(&self, input: CreateClient) -> Result<Client, AppError>;
    /// Newest first. `search` matches name or email, case-insensitively.
    async fn list_clients(
        &self,
        user_id: &str,
        search: Option<&str>,
    ) -> Result<Vec<Client>, AppError>;
    async fn get_client(&self, user_id: &str, client_id: &str)
    -> Result<Option<Client>, AppError>;
    async fn find_client_by_name(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<Client>, AppError>;
    /// A rename is copied onto the client's invoices.
    async fn update_client(
        &self,
        user_id: &str,
        client_id: &str,
        update: UpdateClient,
    ) -> Result<Option<Client>, AppError>;
    async fn delete_client(&self, user_id: &str, client_id: &str) -> Result<bool, AppError>;
    async fn update_client_stats(
        &self,
        user_id: &str,
        client_id: &str,
        stats: &ClientStats,
    ) -> Result<(), AppError>;
    async fn count_clients(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, AppError>;

    // Invoices

    async fn create_invoice(&self, input: CreateInvoice) -> Result<Invoice, AppError>;
    /// Newest first, truncated to `filter.limit` when set.
    async fn list_invoices(
        &self,
        user_id: &str,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError>;
    async fn get_invoice(
        &self,
        user_id: &str,
        invoice_id: &str,
    ) -> Result<Option<Invoice>, AppError>;
    async fn update_invoice(
        &self,
        user_id: &str,
        invoice_id: &str,
        update: UpdateInvoice,
    ) -> Result<Option<Invoice>, AppError>;
    async fn delete_invoice(&self, user_id: &str, invoice_id: &str) -> Result<bool, AppError>;
    async fn count_invoices(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, AppError>;

    // Usage

    async fn record_usage(&self, input: CreateUsageLog) -> Result<UsageLog, AppError>;
    /// Number of rows (not the sum of `count`) since `since`.
    async fn count_usage(
        &self,
        user_id: &str,
        feature_type: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, AppError>;
    async fn list_usage(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<UsageLog>, AppError>;

    // Analytics

    /// Adds `delta` to the user's row for `date`, creating it if needed.
    async fn record_daily_activity(
        &self,
        user_id: &str,
        date: NaiveDate,
        delta: &ActivityDelta,
    ) -> Result<(), AppError>;
    /// Oldest first.
    async fn list_analytics(
        &self,
        user_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<AnalyticsData>, AppError>;
}
