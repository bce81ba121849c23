//! Domain models for invoicing-service.

mod analytics;
mod client;
mod invoice;
mod plan;
mod preferences;
mod subscription;
mod usage;
mod user;

pub use analytics::{ActivityDelta, AnalyticsData};
pub use client::{Client, ClientStats, CreateClient, UpdateClient};
pub use invoice::{CreateInvoice, Invoice, InvoiceStatus, ListInvoicesFilter, UpdateInvoice};
pub use plan::{Plan, UNLIMITED, default_plans};
pub use preferences::{PreferencesInput, UserPreferences};
pub use subscription::{Subscription, SubscriptionStatus, UpsertSubscription};
pub use usage::{CreateUsageLog, UsageLog};
pub use user::{CreateUser, UpdateUser, User};
