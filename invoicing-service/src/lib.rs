//! Multi-tenant invoicing API.
//!
//! Users own clients and invoices; plans and subscriptions decide request
//! budgets and feature access; usage is logged and rolled up per day.

pub mod config;
pub mod currency;
pub mod dtos;
pub mod handlers;
pub mod ids;
pub mod middleware;
pub mod models;
pub mod reporting;
pub mod services;
pub mod startup;
pub mod utils;
