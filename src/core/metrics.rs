use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

pub(crate) const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub(crate) const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub(crate) const ASSIGNMENT_AUTOSAVES_TOTAL: &str = "assignment_autosaves_total";
pub(crate) const ASSIGNMENT_SUBMISSIONS_TOTAL: &str = "assignment_submissions_total";
pub(crate) const NOTIFICATIONS_FAILED_TOTAL: &str = "assignment_notifications_failed_total";

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe();
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe() {
    metrics::describe_counter!(HTTP_REQUESTS_TOTAL, "HTTP responses by status code");
    metrics::describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "HTTP request latency"
    );
    metrics::describe_counter!(ASSIGNMENT_AUTOSAVES_TOTAL, "Accepted autosave calls");
    metrics::describe_counter!(ASSIGNMENT_SUBMISSIONS_TOTAL, "Graded submissions");
    metrics::describe_counter!(NOTIFICATIONS_FAILED_TOTAL, "Dropped best-effort notifications");
}
