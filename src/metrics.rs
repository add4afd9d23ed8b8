//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("mimic_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "mimic_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // Remote store metrics
    pub static ref STORE_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("mimic_store_requests_total", "Total number of remote store requests"),
        &["operation", "collection"]
    ).expect("metric can be created");
    pub static ref STORE_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "mimic_store_request_duration_seconds",
            "Remote store request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["operation", "collection"]
    ).expect("metric can be created");

    // Snapshot / refresh metrics
    pub static ref REFRESHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("mimic_refreshes_total", "Total number of snapshot refreshes"),
        &["status"]
    ).expect("metric can be created");
    pub static ref REFRESH_DURATION_SECONDS: prometheus::Histogram = prometheus::Histogram::with_opts(
        HistogramOpts::new(
            "mimic_refresh_duration_seconds",
            "Full snapshot refresh duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0])
    ).expect("metric can be created");
    pub static ref SNAPSHOT_VERSION: IntGauge = IntGauge::new(
        "mimic_snapshot_version",
        "Version of the currently installed snapshot"
    ).expect("metric can be created");
    pub static ref SNAPSHOT_PROFILES: IntGauge = IntGauge::new(
        "mimic_snapshot_profiles",
        "Profiles in the current snapshot"
    ).expect("metric can be created");
    pub static ref SNAPSHOT_POSTS: IntGauge = IntGauge::new(
        "mimic_snapshot_posts",
        "Posts in the current snapshot"
    ).expect("metric can be created");

    // Compose assist metrics
    pub static ref ASSIST_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("mimic_assist_requests_total", "Total number of compose-assist requests"),
        &["kind", "status"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("mimic_errors_total", "Total number of errors"),
        &["error_type", "endpoint"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("HTTP_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("HTTP_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(STORE_REQUESTS_TOTAL.clone()))
        .expect("STORE_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(STORE_REQUEST_DURATION_SECONDS.clone()))
        .expect("STORE_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(REFRESHES_TOTAL.clone()))
        .expect("REFRESHES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(REFRESH_DURATION_SECONDS.clone()))
        .expect("REFRESH_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(SNAPSHOT_VERSION.clone()))
        .expect("SNAPSHOT_VERSION can be registered");
    REGISTRY
        .register(Box::new(SNAPSHOT_PROFILES.clone()))
        .expect("SNAPSHOT_PROFILES can be registered");
    REGISTRY
        .register(Box::new(SNAPSHOT_POSTS.clone()))
        .expect("SNAPSHOT_POSTS can be registered");
    REGISTRY
        .register(Box::new(ASSIST_REQUESTS_TOTAL.clone()))
        .expect("ASSIST_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
