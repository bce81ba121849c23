//! Prometheus metrics for invoicing-service.

use once_cell::sync::Lazy;
use prometheus::{
    CounterVec, HistogramVec, IntCounterVec, TextEncoder, register_counter_vec,
    register_histogram_vec, register_int_counter_vec,
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Invoice counter by status at creation.
pub static INVOICES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "invoicing_invoices_total",
        "Total number of invoices created by status",
        &["status"] // paid, unpaid, overdue, processing
    )
    .expect("Failed to register invoices_total")
});

/// Client operations (created, updated, deleted).
pub static CLIENT_OPERATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "invoicing_client_operations_total",
        "Total number of client operations",
        &["operation"]
    )
    .expect("Failed to register client_operations_total")
});

/// Monetary amount counter by currency.
pub static INVOICE_AMOUNT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_invoice_amount_total",
        "Total invoiced amount by currency",
        &["currency"]
    )
    .expect("Failed to register invoice_amount_total")
});

/// Rate limiter decisions by plan.
pub static RATE_LIMIT_DECISIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "invoicing_rate_limit_decisions_total",
        "Rate limiter decisions by plan",
        &["plan", "decision"]
    )
    .expect("Failed to register rate_limit_decisions_total")
});

/// Feature gate decisions by feature.
pub static FEATURE_GATE_DECISIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "invoicing_feature_gate_decisions_total",
        "Feature gate decisions by feature",
        &["feature", "decision"]
    )
    .expect("Failed to register feature_gate_decisions_total")
});

/// Usage events written, by kind and outcome.
pub static USAGE_EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "invoicing_usage_events_total",
        "Usage log writes by feature type",
        &["feature_type", "outcome"]
    )
    .expect("Failed to register usage_events_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "invoicing_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "invoicing_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&INVOICES_TOTAL);
    Lazy::force(&CLIENT_OPERATIONS_TOTAL);
    Lazy::force(&INVOICE_AMOUNT_TOTAL);
    Lazy::force(&RATE_LIMIT_DECISIONS_TOTAL);
    Lazy::force(&FEATURE_GATE_DECISIONS_TOTAL);
    Lazy::force(&USAGE_EVENTS_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}

pub fn record_invoice_created(status: &str, currency: &str, amount: Decimal) {
    INVOICES_TOTAL.with_label_values(&[status]).inc();
    INVOICE_AMOUNT_TOTAL
        .with_label_values(&[currency])
        .inc_by(amount.to_f64().unwrap_or_default().max(0.0));
}

pub fn record_client_operation(operation: &str) {
    CLIENT_OPERATIONS_TOTAL.with_label_values(&[operation]).inc();
}

pub fn record_rate_limit(plan: &str, allowed: bool) {
    let decision = if allowed { "allowed" } else { "limited" };
    RATE_LIMIT_DECISIONS_TOTAL
        .with_label_values(&[plan, decision])
        .inc();
}

pub fn record_feature_check(feature: &str, allowed: bool) {
    let decision = if allowed { "allowed" } else { "denied" };
    FEATURE_GATE_DECISIONS_TOTAL
        .with_label_values(&[feature, decision])
        .inc();
}

/// `api_request_*` rows collapse into one label to keep cardinality bounded.
pub fn record_usage_event(feature_type: &str, ok: bool) {
    let kind = if feature_type.starts_with("api_request_") {
        "api_request"
    } else {
        feature_type
    };
    let outcome = if ok { "recorded" } else { "failed" };
    USAGE_EVENTS_TOTAL.with_label_values(&[kind, outcome]).inc();
}

pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}
