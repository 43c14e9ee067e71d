//! Prometheus metrics
//!
//! The recorder is installed once per process; `/metrics` renders it.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const CHAT_REQUESTS_METRIC: &str = "lead_assistant_chat_requests_total";
pub const CHAT_DURATION_METRIC: &str = "lead_assistant_chat_duration_seconds";

static PROMETHEUS: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder
///
/// Idempotent: later calls return the first handle. `None` if another
/// recorder was installed first.
pub fn init_metrics() -> Option<PrometheusHandle> {
    PROMETHEUS
        .get_or_try_init(|| PrometheusBuilder::new().install_recorder())
        .map_err(|e| tracing::warn!(error = %e, "Failed to install Prometheus recorder"))
        .ok()
        .cloned()
}

pub async fn metrics_handler() -> impl IntoResponse {
    match PROMETHEUS.get() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}

/// Count one `/chat` request and its latency
pub fn record_chat_turn(status: StatusCode, elapsed: Duration) {
    let status = status.as_u16().to_string();
    metrics::counter!(CHAT_REQUESTS_METRIC, "status" => status.clone()).increment(1);
    metrics::histogram!(CHAT_DURATION_METRIC, "status" => status).record(elapsed.as_secs_f64());
}
