use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder once per process. Subsequent calls (e.g.
/// a second application instance in the test suite) are no-ops.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => {
            tracing::warn!("failed to install Prometheus recorder: {}", e);
        }
    }
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Business counters recorded from the order lifecycle.
pub fn record_order_placed(currency: &str) {
    metrics::counter!("orders_placed_total", &[("currency", currency.to_string())]).increment(1);
}

pub fn record_order_cancelled(previous_status: &str) {
    metrics::counter!(
        "orders_cancelled_total",
        &[("previous_status", previous_status.to_string())]
    )
    .increment(1);
}
