//! HTTP handlers, one module per route group.

pub mod analytics;
pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod invoices;
pub mod settings;
pub mod subscription;
