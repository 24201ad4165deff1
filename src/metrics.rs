//! Prometheus exporter and HTTP request metrics.
//!
//! Engine counters (`enrollments_total`, `capacity_race_retries_total`,
//! `stats_drift_detected_total`, ...) are emitted by the enrollment crate
//! through the `metrics` facade; this module installs the recorder they land
//! in and describes them.

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
    routing::get,
};
use metrics::{Unit, counter, describe_counter, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::{Duration, Instant};
use tracing::warn;

const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

/// Installs the Prometheus recorder with an upkeep task.
/// Returns `None` if the recorder could not be installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    let handle = match PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )
        .and_then(|builder| builder.install_recorder())
    {
        Ok(handle) => handle,
        Err(e) => {
            warn!(error = %e, "Failed to install Prometheus recorder, metrics disabled");
            return None;
        }
    };

    describe_metrics();

    // Spawn upkeep task to clean stale metrics
    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            upkeep_handle.run_upkeep();
        }
    });

    Some(handle)
}

fn describe_metrics() {
    describe_counter!("enrollments_total", "Enrollment requests by outcome");
    describe_counter!("transfers_total", "Transfer requests by outcome");
    describe_counter!("withdrawals_total", "Students withdrawn");
    describe_counter!(
        "capacity_race_retries_total",
        "Enrollment attempts retried after losing a section to a concurrent write"
    );
    describe_counter!(
        "stats_drift_detected_total",
        "Cached section counters found disagreeing with membership"
    );
    describe_counter!("reconciliations_total", "Completed reconciliation passes");
    describe_counter!(
        "reconciliation_failures_total",
        "Reconciliations that failed and were deferred to the sweep"
    );
    describe_counter!(
        "reconcile_members_pruned_total",
        "Stale membership entries removed by the sweep"
    );
    describe_counter!(
        "reconcile_students_repaired_total",
        "Students whose section reference or membership the sweep repaired"
    );
    describe_counter!(
        "reconcile_orphans_removed_total",
        "Student rows from failed enrollments removed by the sweep"
    );
    describe_counter!(
        "notifications_failed_total",
        "Credential notifications that could not be delivered"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request latency"
    );
}

/// Metrics middleware to track HTTP requests
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().as_str().to_owned();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    gauge!("http_requests_active").increment(1.0);

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!("http_requests_total", "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!("http_request_duration_seconds", "method" => method, "path" => path).record(latency);

    gauge!("http_requests_active").decrement(1.0);

    response
}

/// Router for metrics server
pub fn metrics_app(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}
