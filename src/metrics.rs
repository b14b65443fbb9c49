use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics exporter
/// Returns a handle that can render current metrics for scraping or dumping
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        // Fix processing is sub-millisecond in the common case; size the
        // buckets accordingly
        .set_buckets_for_metric(
            Matcher::Full("nav_tracker.fix_processing_ms".to_string()),
            &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )
        .expect("failed to set buckets for nav_tracker.fix_processing_ms")
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let _ = METRICS_HANDLE.set(handle.clone());
    handle
}

/// Render the current metrics in Prometheus text exposition format
/// Returns None when the exporter was never initialized
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}
