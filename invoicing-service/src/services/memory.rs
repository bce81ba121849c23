//! In-process [`Store`] used by tests and `STORAGE_BACKEND=memory`.
//!
//! Mirrors the relational schema closely enough for the handlers not to
//! notice: unique emails, foreign keys from invoices to clients and from
//! subscriptions to plans, and cascading deletes of a user's rows.

use super::store::Store;
use crate::ids::{self, IdKind};
use crate::models::{
    ActivityDelta, AnalyticsData, Client, ClientStats, CreateClient, CreateInvoice,
    CreateUsageLog, CreateUser, Invoice, ListInvoicesFilter, Plan, PreferencesInput,
    Subscription, UpdateClient, UpdateInvoice, UpdateUser, UpsertSubscription, UsageLog, User,
    UserPreferences,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<String, User>,
    plans: BTreeMap<String, Plan>,
    /// Keyed by user id.
    subscriptions: BTreeMap<String, Subscription>,
    /// Keyed by user id.
    preferences: BTreeMap<String, UserPreferences>,
    clients: BTreeMap<String, Client>,
    invoices: BTreeMap<String, Invoice>,
    usage_logs: Vec<UsageLog>,
    analytics: BTreeMap<(String, NaiveDate), AnalyticsData>,
}

impl Tables {
    fn email_taken(&self, email: &str, except_user: Option<&str>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id.as_str()) != except_user)
    }

    fn owned_client_mut(&mut self, user_id: &str, client_id: &str) -> Option<&mut Client> {
        self.clients
            .get_mut(client_id)
            .filter(|c| c.user_id == user_id)
    }

    fn owned_invoice_mut(&mut self, user_id: &str, invoice_id: &str) -> Option<&mut Invoice> {
        self.invoices
            .get_mut(invoice_id)
            .filter(|i| i.user_id == user_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, F>(rows: &mut [T], key: F)
where
    F: Fn(&T) -> (DateTime<Utc>, &str),
{
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn create_user(&self, input: CreateUser) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;

        if tables.email_taken(&input.email, None) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Email '{}' is already registered",
                input.email
            )));
        }
        if let Some(clerk_id) = &input.clerk_id {
            if tables
                .users
                .values()
                .any(|u| u.clerk_id.as_deref() == Some(clerk_id.as_str()))
            {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "User with external id '{}' already exists",
                    clerk_id
                )));
            }
        }

        let now = Utc::now();
        let user = User {
            id: ids::generate(IdKind::User),
            clerk_id: input.clerk_id,
            email: input.email,
            display_name: input.display_name,
            profile_image: input.profile_image,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(user_id).cloned())
    }

    async fn get_user_by_clerk_id(&self, clerk_id: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.clerk_id.as_deref() == Some(clerk_id))
            .cloned())
    }

    async fn update_user(
        &self,
        user_id: &str,
        update: UpdateUser,
    ) -> Result<Option<User>, AppError> {
        let mut tables = self.tables.write().await;

        if let Some(email) = &update.email {
            if tables.email_taken(email, Some(user_id)) {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Email '{}' is already registered",
                    email
                )));
            }
        }

        let Some(user) = tables.users.get_mut(user_id) else {
            return Ok(None);
        };
        user.apply(&update);
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user_by_clerk_id(&self, clerk_id: &str) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;

        let Some(user_id) = tables
            .users
            .values()
            .find(|u| u.clerk_id.as_deref() == Some(clerk_id))
            .map(|u| u.id.clone())
        else {
            return Ok(false);
        };

        tables.users.remove(&user_id);
        tables.subscriptions.remove(&user_id);
        tables.preferences.remove(&user_id);
        tables.clients.retain(|_, c| c.user_id != user_id);
        tables.invoices.retain(|_, i| i.user_id != user_id);
        tables.usage_logs.retain(|l| l.user_id != user_id);
        tables.analytics.retain(|(owner, _), _| *owner != user_id);

        Ok(true)
    }

    async fn upsert_plan(&self, plan: &Plan) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        let mut plan = plan.clone();
        if let Some(existing) = tables.plans.get(&plan.id) {
            plan.created_at = existing.created_at;
        }
        tables.plans.insert(plan.id.clone(), plan);
        Ok(())
    }

    async fn list_plans(&self) -> Result<Vec<Plan>, AppError> {
        let mut plans: Vec<Plan> = self.tables.read().await.plans.values().cloned().collect();
        plans.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.id.cmp(&b.id)));
        Ok(plans)
    }

    async fn get_plan(&self, plan_id: &str) -> Result<Option<Plan>, AppError> {
        Ok(self.tables.read().await.plans.get(plan_id).cloned())
    }

    async fn get_subscription(&self, user_id: &str) -> Result<Option<Subscription>, AppError> {
        Ok(self.tables.read().await.subscriptions.get(user_id).cloned())
    }

    async fn upsert_subscription(
        &self,
        input: UpsertSubscription,
    ) -> Result<Subscription, AppError> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&input.user_id) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "User '{}' does not exist",
                input.user_id
            )));
        }
        if !tables.plans.contains_key(&input.plan_id) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Plan '{}' does not exist",
                input.plan_id
            )));
        }

        let now = Utc::now();
        let (id, created_at) = match tables.subscriptions.get(&input.user_id) {
            Some(existing) => (existing.id.clone(), existing.created_at),
            None => (ids::generate(IdKind::Subscription), now),
        };

        let subscription = Subscription {
            id,
            user_id: input.user_id.clone(),
            plan_id: input.plan_id,
            status: input.status.as_str().to_string(),
            current_period_end: input.current_period_end,
            trial_end: input.trial_end,
            canceled_at: input.canceled_at,
            created_at,
            updated_at: now,
        };
        tables
            .subscriptions
            .insert(input.user_id, subscription.clone());
        Ok(subscription)
    }

    async fn get_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>, AppError> {
        Ok(self.tables.read().await.preferences.get(user_id).cloned())
    }

    async fn upsert_preferences(
        &self,
        user_id: &str,
        input: PreferencesInput,
    ) -> Result<UserPreferences, AppError> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(user_id) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "User '{}' does not exist",
                user_id
            )));
        }

        let now = Utc::now();
        let (id, created_at) = match tables.preferences.get(user_id) {
            Some(existing) => (existing.id.clone(), existing.created_at),
            None => (ids::generate(IdKind::Preferences), now),
        };

        let preferences = UserPreferences {
            id,
            user_id: user_id.to_string(),
            theme: input.theme,
            language: input.language,
            email_notifications: input.email_notifications,
            push_notifications: input.push_notifications,
            marketing_emails: input.marketing_emails,
            weekly_reports: input.weekly_reports,
            security_alerts: input.security_alerts,
            currency: input.currency,
            timezone: input.timezone,
            created_at,
            updated_at: now,
        };
        tables
            .preferences
            .insert(user_id.to_string(), preferences.clone());
        Ok(preferences)
    }

    async fn create_client(&self, input: CreateClient) -> Result<Client, AppError> {
        let now = Utc::now();
        let client = Client {
            id: ids::generate(IdKind::Client),
            user_id: input.user_id,
            name: input.name,
            email: input.email,
            avatar: input.avatar,
            payment_delay: input.payment_delay,
            total_invoiced: Decimal::ZERO,
            total_paid: Decimal::ZERO,
            invoice_count: 0,
            average_invoice: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .write()
            .await
            .clients
            .insert(client.id.clone(), client.clone());
        Ok(client)
    }

    async fn list_clients(
        &self,
        user_id: &str,
        search: Option<&str>,
    ) -> Result<Vec<Client>, AppError> {
        let needle = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let tables = self.tables.read().await;
        let mut clients: Vec<Client> = tables
            .clients
            .values()
            .filter(|c| c.user_id == user_id)
            .filter(|c| {
                needle
                    .as_deref()
                    .is_none_or(|n| contains_ci(&c.name, n) || contains_ci(&c.email, n))
            })
            .cloned()
            .collect();

        newest_first(&mut clients, |c| (c.created_at, c.id.as_str()));
        Ok(clients)
    }

    async fn get_client(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> Result<Option<Client>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .clients
            .get(client_id)
            .filter(|c| c.user_id == user_id)
            .cloned())
    }

    async fn find_client_by_name(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<Client>, AppError> {
        let tables = self.tables.read().await;
        let mut matches: Vec<&Client> = tables
            .clients
            .values()
            .filter(|c| c.user_id == user_id && c.name == name)
            .collect();
        matches.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(matches.first().map(|c| (*c).clone()))
    }

    async fn update_client(
        &self,
        user_id: &str,
        client_id: &str,
        update: UpdateClient,
    ) -> Result<Option<Client>, AppError> {
        let mut tables = self.tables.write().await;

        let Some(client) = tables.owned_client_mut(user_id, client_id) else {
            return Ok(None);
        };
        client.apply(&update);
        client.updated_at = Utc::now();
        let client = client.clone();

        if update.name.is_some() {
            for invoice in tables
                .invoices
                .values_mut()
                .filter(|i| i.client_id == client.id)
            {
                invoice.client_name = client.name.clone();
            }
        }

        Ok(Some(client))
    }

    async fn delete_client(&self, user_id: &str, client_id: &str) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;

        if tables.invoices.values().any(|i| i.client_id == client_id) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Cannot delete client with existing invoices"
            )));
        }

        match tables.clients.get(client_id) {
            Some(c) if c.user_id == user_id => {
                tables.clients.remove(client_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_client_stats(
        &self,
        user_id: &str,
        client_id: &str,
        stats: &ClientStats,
    ) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if let Some(client) = tables.owned_client_mut(user_id, client_id) {
            client.set_stats(stats);
        }
        Ok(())
    }

    async fn count_clients(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, AppError> {
        let tables = self.tables.read().await;
        let count = tables
            .clients
            .values()
            .filter(|c| c.user_id == user_id)
            .filter(|c| since.is_none_or(|s| c.created_at >= s))
            .count();
        Ok(count as i64)
    }

    async fn create_invoice(&self, input: CreateInvoice) -> Result<Invoice, AppError> {
        let mut tables = self.tables.write().await;

        if !tables.clients.contains_key(&input.client_id) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Client '{}' does not exist",
                input.client_id
            )));
        }

        let now = Utc::now();
        let invoice = Invoice {
            id: ids::generate(IdKind::Invoice),
            user_id: input.user_id,
            client_id: input.client_id,
            client_name: input.client_name,
            invoice_date: input.invoice_date,
            due_date: input.due_date,
            amount: input.amount,
            currency_type: input.currency_type,
            status: input.status.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.invoices.insert(invoice.id.clone(), invoice.clone());
        Ok(invoice)
    }

    async fn list_invoices(
        &self,
        user_id: &str,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        let tables = self.tables.read().await;
        let mut invoices: Vec<Invoice> = tables
            .invoices
            .values()
            .filter(|i| i.user_id == user_id && filter.matches(i))
            .cloned()
            .collect();

        newest_first(&mut invoices, |i| (i.created_at, i.id.as_str()));
        if let Some(limit) = filter.limit {
            invoices.truncate(limit.max(0) as usize);
        }
        Ok(invoices)
    }

    async fn get_invoice(
        &self,
        user_id: &str,
        invoice_id: &str,
    ) -> Result<Option<Invoice>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .invoices
            .get(invoice_id)
            .filter(|i| i.user_id == user_id)
            .cloned())
    }

    async fn update_invoice(
        &self,
        user_id: &str,
        invoice_id: &str,
        update: UpdateInvoice,
    ) -> Result<Option<Invoice>, AppError> {
        let mut tables = self.tables.write().await;

        if let Some(client_id) = &update.client_id {
            if !tables.clients.contains_key(client_id) {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Client '{}' does not exist",
                    client_id
                )));
            }
        }

        let Some(invoice) = tables.owned_invoice_mut(user_id, invoice_id) else {
            return Ok(None);
        };
        invoice.apply(&update);
        invoice.updated_at = Utc::now();
        Ok(Some(invoice.clone()))
    }

    async fn delete_invoice(&self, user_id: &str, invoice_id: &str) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.invoices.get(invoice_id) {
            Some(i) if i.user_id == user_id => {
                tables.invoices.remove(invoice_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_invoices(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, AppError> {
        let tables = self.tables.read().await;
        let count = tables
            .invoices
            .values()
            .filter(|i| i.user_id == user_id)
            .filter(|i| since.is_none_or(|s| i.created_at >= s))
            .count();
        Ok(count as i64)
    }

    async fn record_usage(&self, input: CreateUsageLog) -> Result<UsageLog, AppError> {
        let log = UsageLog {
            id: ids::generate(IdKind::UsageLog),
            user_id: input.user_id,
            feature_type: input.feature_type,
            count: input.count,
            metadata: input.metadata,
            timestamp: Utc::now(),
        };
        self.tables.write().await.usage_logs.push(log.clone());
        Ok(log)
    }

    async fn count_usage(
        &self,
        user_id: &str,
        feature_type: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let tables = self.tables.read().await;
        let count = tables
            .usage_logs
            .iter()
            .filter(|l| l.user_id == user_id && l.feature_type == feature_type)
            .filter(|l| l.timestamp >= since)
            .count();
        Ok(count as i64)
    }

    async fn list_usage(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<UsageLog>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .usage_logs
            .iter()
            .filter(|l| l.user_id == user_id && l.timestamp >= since)
            .cloned()
            .collect())
    }

    async fn record_daily_activity(
        &self,
        user_id: &str,
        date: NaiveDate,
        delta: &ActivityDelta,
    ) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        let row = tables
            .analytics
            .entry((user_id.to_string(), date))
            .or_insert_with(|| AnalyticsData {
                id: ids::generate(IdKind::Analytics),
                user_id: user_id.to_string(),
                date,
                invoices_created: 0,
                clients_added: 0,
                revenue_generated: Decimal::ZERO,
                messages_count: 0,
                created_at: Utc::now(),
            });

        row.invoices_created += delta.invoices_created;
        row.clients_added += delta.clients_added;
        row.revenue_generated += delta.revenue_generated;
        row.messages_count += delta.messages_count;
        Ok(())
    }

    async fn list_analytics(
        &self,
        user_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<AnalyticsData>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .analytics
            .values()
            .filter(|a| a.user_id == user_id && a.date >= since)
            .cloned()
            .collect())
    }
}
