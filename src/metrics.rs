// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the ptrsync engine.
//!
//! All metrics carry the `ptrsync_` namespace prefix.
//!
//! # Metrics Categories
//!
//! - **Mutation Metrics** - Record create/update/delete operations by record type
//! - **Synchronization Metrics** - Outcome of every PTR synchronization
//! - **Error Metrics** - Errors and warnings by stable reason string
//! - **IPAM Metrics** - Outcome of IPAM lookups
//! - **Performance Metrics** - Time spent inside the write transaction
//!
//! # Example
//!
//! ```rust,no_run
//! use ptrsync::metrics::{gather_metrics, record_ptr_sync};
//!
//! record_ptr_sync("created");
//! let text = gather_metrics().unwrap();
//! assert!(text.contains("ptrsync_ptr_sync_total"));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

use crate::constants::METRICS_NAMESPACE;

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Mutation Metrics
// ============================================================================

/// Total number of record mutations
///
/// Labels:
/// - `operation`: `create`, `update` or `delete`
/// - `record_type`: DNS record type (e.g., `A`, `PTR`)
pub static RECORD_MUTATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_record_mutations_total"),
        "Total number of record mutations by operation and record type",
    );
    let counter = CounterVec::new(opts, &["operation", "record_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Synchronization Metrics
// ============================================================================

/// Total number of PTR synchronizations by outcome
///
/// Labels:
/// - `action`: `created`, `updated`, `recreated`, `removed`, `unchanged`, `skipped`, `not_applicable`
pub static PTR_SYNC_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_ptr_sync_total"),
        "Total number of PTR synchronizations by action",
    );
    let counter = CounterVec::new(opts, &["action"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors and warnings
///
/// Labels:
/// - `reason`: Stable reason string (e.g., `PtrNameCollision`, `DuplicateRecord`)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by reason",
    );
    let counter = CounterVec::new(opts, &["reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// IPAM Metrics
// ============================================================================

/// Total number of IPAM lookups
///
/// Labels:
/// - `outcome`: `found`, `missing` or `degraded`
pub static IPAM_LOOKUPS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_ipam_lookups_total"),
        "Total number of IPAM lookups by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Performance Metrics
// ============================================================================

/// Time spent holding the engine write lock
///
/// Labels:
/// - `operation`: Engine operation (e.g., `create_record`, `delete_zone`)
pub static TRANSACTION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_transaction_duration_seconds"),
        "Duration of write transactions in seconds by operation",
    )
    .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]);
    let histogram = HistogramVec::new(opts, &["operation"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a committed record mutation
pub fn record_mutation(operation: &str, record_type: &str) {
    RECORD_MUTATIONS_TOTAL
        .with_label_values(&[operation, record_type])
        .inc();
}

/// Record the outcome of one PTR synchronization
pub fn record_ptr_sync(action: &str) {
    PTR_SYNC_TOTAL.with_label_values(&[action]).inc();
}

/// Record an error or warning by its reason string
pub fn record_error(reason: &str) {
    ERRORS_TOTAL.with_label_values(&[reason]).inc();
}

/// Record the outcome of an IPAM lookup
pub fn record_ipam_lookup(outcome: &str) {
    IPAM_LOOKUPS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record how long a write transaction held the lock
pub fn record_transaction(operation: &str, duration: Duration) {
    TRANSACTION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
