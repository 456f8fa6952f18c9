// src/core/metrics.rs

//! Defines and registers Prometheus metrics for pipeline monitoring.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Histogram, TextEncoder, register_counter, register_counter_vec,
    register_histogram,
};

lazy_static! {
    // --- Pipeline Counters ---
    /// The total number of action invocations, labeled by action name.
    pub static ref ACTIONS_TOTAL: CounterVec =
        register_counter_vec!("actiongate_actions_total", "Total number of action invocations, labeled by action.", &["action"]).unwrap();
    /// The total number of invocations short-circuited by the validation stage.
    pub static ref VALIDATION_FAILURES_TOTAL: Counter =
        register_counter!("actiongate_validation_failures_total", "Total number of invocations rejected by validation.").unwrap();
    /// The total number of handler failures translated into fault responses.
    pub static ref HANDLER_FAULTS_TOTAL: Counter =
        register_counter!("actiongate_handler_faults_total", "Total number of unhandled handler failures.").unwrap();
    /// The total number of infrastructure failures propagated out of the pipeline.
    pub static ref INFRASTRUCTURE_FAULTS_TOTAL: Counter =
        register_counter!("actiongate_infrastructure_faults_total", "Total number of unit of work and resolution failures.").unwrap();


    // --- Transaction Counters ---
    /// The total number of units of work committed.
    pub static ref TRANSACTIONS_COMMITTED_TOTAL: Counter =
        register_counter!("actiongate_transactions_committed_total", "Total number of committed transactions.").unwrap();
    /// The total number of units of work rolled back.
    pub static ref TRANSACTIONS_ROLLED_BACK_TOTAL: Counter =
        register_counter!("actiongate_transactions_rolled_back_total", "Total number of rolled back transactions.").unwrap();


    // --- Histograms ---
    /// A histogram of end-to-end action latencies.
    pub static ref ACTION_LATENCY_SECONDS: Histogram =
        register_histogram!("actiongate_action_latency_seconds", "Latency of action processing in seconds.").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode_to_string(&metric_families).unwrap_or_default()
}
