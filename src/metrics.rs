// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the metalcast compiler.
//!
//! This module provides metrics collection with the namespace prefix
//! `metalcast_firestoned_io_` (prometheus-safe version of
//! "metalcast.firestoned.io"). Serving the registry over HTTP is the
//! embedding process's concern; [`gather_metrics`] encodes the current
//! state in the text exposition format.

use prometheus::{
    Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

/// Namespace prefix for all metalcast metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "metalcast_firestoned_io";

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Total number of compilations by kind and outcome
///
/// Labels:
/// - `kind`: what was compiled (`control_plane`, `worker`)
/// - `status`: outcome (`success`, `error`)
pub static COMPILATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_compilations_total"),
        "Total number of compilations by kind and outcome",
    );
    let counter = CounterVec::new(opts, &["kind", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of compilations in seconds
///
/// Labels:
/// - `kind`: what was compiled (`control_plane`, `worker`)
pub static COMPILATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_compilation_duration_seconds"),
        "Duration of compilations in seconds by kind",
    )
    .buckets(vec![0.0001, 0.001, 0.01, 0.1, 0.5, 1.0, 5.0]);
    let histogram = HistogramVec::new(opts, &["kind"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of compilation failures by kind and status reason
///
/// Labels:
/// - `kind`: what was compiled (`control_plane`, `worker`)
/// - `reason`: status reason code of the failure
pub static COMPILE_ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_compile_errors_total"),
        "Total number of compilation failures by kind and status reason",
    );
    let counter = CounterVec::new(opts, &["kind", "reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of machine image lookups served from the persisted status
/// record instead of the catalog
pub static IMAGE_STATUS_FALLBACKS_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_image_status_fallbacks_total"),
        "Total number of machine image lookups served from the persisted status record",
    );
    let counter = Counter::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Record a successful compilation of the given kind.
pub fn record_compilation_success(kind: &str, duration: Duration) {
    COMPILATIONS_TOTAL
        .with_label_values(&[kind, "success"])
        .inc();
    COMPILATION_DURATION_SECONDS
        .with_label_values(&[kind])
        .observe(duration.as_secs_f64());
}

/// Record a failed compilation of the given kind.
pub fn record_compilation_error(kind: &str, reason: &str) {
    COMPILATIONS_TOTAL.with_label_values(&[kind, "error"]).inc();
    COMPILE_ERRORS_TOTAL
        .with_label_values(&[kind, reason])
        .inc();
}

/// Record a machine image lookup that fell back to the status record.
pub fn record_image_status_fallback() {
    IMAGE_STATUS_FALLBACKS_TOTAL.inc();
}

/// Encode all registered metrics in the Prometheus text format.
#[must_use]
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
