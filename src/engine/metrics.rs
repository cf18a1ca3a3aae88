//! Metrics collection for batch execution
//!
//! Provides Prometheus-compatible metrics for monitoring scheduler activity:
//! how often loaders are registered and ticked, how deep the registry runs,
//! and how many futures were left broken.

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, Encoder, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};

use crate::loader::LoaderKey;

lazy_static! {
    /// Counter for resolution steps
    static ref TICKS: IntCounter = register_int_counter!(
        "querybatch_ticks_total",
        "Total number of resolution steps performed"
    ).unwrap();

    /// Counter for loader registrations, labelled by loader type
    static ref REGISTRATIONS: IntCounterVec = register_int_counter_vec!(
        "querybatch_loader_registrations_total",
        "Total number of loader registrations",
        &["loader"]
    ).unwrap();

    /// Counter for broken-future rejections
    static ref BROKEN_FUTURES: IntCounter = register_int_counter!(
        "querybatch_broken_futures_total",
        "Futures rejected because the registry drained while they were still pending"
    ).unwrap();

    /// Gauge for current registry depth
    static ref REGISTRY_DEPTH: IntGauge = register_int_gauge!(
        "querybatch_registry_depth",
        "Loaders currently queued for resolution"
    ).unwrap();
}

pub(crate) fn record_tick() {
    TICKS.inc();
}

pub(crate) fn record_registration(key: &LoaderKey) {
    REGISTRATIONS.with_label_values(&[key.type_name()]).inc();
}

pub(crate) fn record_broken_future() {
    BROKEN_FUTURES.inc();
}

pub(crate) fn set_registry_depth(depth: usize) {
    REGISTRY_DEPTH.set(depth as i64);
}

/// Export metrics in Prometheus text format
pub fn export_metrics() -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Failed to convert metrics to UTF-8: {}", e).into())
}
