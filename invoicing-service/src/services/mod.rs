//! Services module for invoicing-service.

pub mod client_stats;
pub mod database;
pub mod memory;
pub mod metrics;
pub mod plans;
pub mod store;
pub mod usage;

pub use client_stats::{refresh_client_stats, refresh_client_stats_by_id};
pub use database::Database;
pub use memory::MemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use plans::subscribed_plan;
pub use store::Store;
pub use usage::UsageTracker;
