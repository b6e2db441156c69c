//! Prometheus metrics, scraped from `/metrics` on the dedicated metrics port.
//!
//! Route handlers and middleware call the `record_*` helpers; nothing here is
//! fallible from the caller's point of view.

use crate::cache::DataSource;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{
    core::Collector, CounterVec, Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec,
    Opts, Registry, TextEncoder,
};
use std::time::Duration;
use tracing::{error, info};

const NAMESPACE: &str = "music_catalog";

const LATENCY_BUCKETS: &[f64] = &[0.002, 0.01, 0.025, 0.1, 0.25, 1.0, 2.5, 10.0];
const HASHING_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5];

fn opts(name: &str, help: &str) -> Opts {
    Opts::new(name, help).namespace(NAMESPACE)
}

fn histogram_opts(name: &str, help: &str, buckets: &[f64]) -> HistogramOpts {
    HistogramOpts::new(name, help)
        .namespace(NAMESPACE)
        .buckets(buckets.to_vec())
}

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        opts("http_requests_total", "Handled HTTP requests by route and status"),
        &["method", "path", "status"]
    )
    .expect("http_requests_total definition");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        histogram_opts(
            "http_request_duration_seconds",
            "Time spent handling a request, by route",
            LATENCY_BUCKETS
        ),
        &["method", "path"]
    )
    .expect("http_request_duration_seconds definition");

    pub static ref LOGINS_TOTAL: CounterVec = CounterVec::new(
        opts("logins_total", "Login attempts by outcome"),
        &["outcome"]
    )
    .expect("logins_total definition");

    /// Dominated by password hashing.
    pub static ref LOGIN_DURATION_SECONDS: Histogram = Histogram::with_opts(histogram_opts(
        "login_duration_seconds",
        "Time spent verifying credentials",
        HASHING_BUCKETS
    ))
    .expect("login_duration_seconds definition");

    pub static ref CACHED_VIEW_READS_TOTAL: CounterVec = CounterVec::new(
        opts("cached_view_reads_total", "Album view reads by where they were served from"),
        &["view", "source"]
    )
    .expect("cached_view_reads_total definition");

    pub static ref CACHE_ENTRIES: Gauge = Gauge::with_opts(opts(
        "cache_entries",
        "Live entries in the in-process cache"
    ))
    .expect("cache_entries definition");

    pub static ref EXPORT_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        opts("export_requests_total", "Playlist export requests by outcome"),
        &["outcome"]
    )
    .expect("export_requests_total definition");

    pub static ref CATALOG_SIZE: GaugeVec = GaugeVec::new(
        opts("catalog_size", "Rows per entity at startup"),
        &["entity"]
    )
    .expect("catalog_size definition");

    pub static ref FAILURES_TOTAL: CounterVec = CounterVec::new(
        opts("failures_total", "Requests that ended in a server-side failure"),
        &["kind"]
    )
    .expect("failures_total definition");

    pub static ref RESIDENT_MEMORY_BYTES: Gauge = Gauge::with_opts(opts(
        "resident_memory_bytes",
        "Resident set size of the server process"
    ))
    .expect("resident_memory_bytes definition");
}

fn collectors() -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()),
        Box::new(LOGINS_TOTAL.clone()),
        Box::new(LOGIN_DURATION_SECONDS.clone()),
        Box::new(CACHED_VIEW_READS_TOTAL.clone()),
        Box::new(CACHE_ENTRIES.clone()),
        Box::new(EXPORT_REQUESTS_TOTAL.clone()),
        Box::new(CATALOG_SIZE.clone()),
        Box::new(FAILURES_TOTAL.clone()),
        Box::new(RESIDENT_MEMORY_BYTES.clone()),
    ]
}

/// Registers every collector. Repeated calls are no-ops.
pub fn init_metrics() {
    let mut registered = 0;
    for collector in collectors() {
        if REGISTRY.register(collector).is_ok() {
            registered += 1;
        }
    }
    if registered > 0 {
        info!("Registered {} metric collectors", registered);
    }
}

pub fn init_catalog_metrics(num_albums: usize, num_songs: usize, num_users: usize) {
    for (entity, count) in [("album", num_albums), ("song", num_songs), ("user", num_users)] {
        CATALOG_SIZE.with_label_values(&[entity]).set(count as f64);
    }
    info!(
        "Catalog holds {} albums, {} songs and {} users",
        num_albums, num_songs, num_users
    );
}

/// `path` is the matched route template, never the raw URI, to keep label cardinality bounded.
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let status = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, status.as_str()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

pub fn record_login_attempt(outcome: &str, duration: Duration) {
    LOGINS_TOTAL.with_label_values(&[outcome]).inc();
    LOGIN_DURATION_SECONDS.observe(duration.as_secs_f64());
}

pub fn record_cache_lookup(view: &str, source: DataSource) {
    CACHED_VIEW_READS_TOTAL
        .with_label_values(&[view, source.as_str()])
        .inc();
}

pub fn set_cache_entries(count: u64) {
    CACHE_ENTRIES.set(count as f64);
}

pub fn record_export_request(outcome: &str) {
    EXPORT_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_error(kind: &str) {
    FAILURES_TOTAL.with_label_values(&[kind]).inc();
}

fn resident_memory_kb(proc_status: &str) -> Option<f64> {
    proc_status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse().ok())
}

/// Samples the RSS from procfs. A no-op where procfs is unavailable.
pub fn update_memory_usage() {
    let Ok(status) = std::fs::read_to_string("/proc/self/status") else {
        return;
    };
    if let Some(kb) = resident_memory_kb(&status) {
        RESIDENT_MEMORY_BYTES.set(kb * 1024.0);
    }
}

pub async fn metrics_handler() -> Response {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("Could not encode metrics: {}", err);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    (
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}
