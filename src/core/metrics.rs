use std::sync::OnceLock;

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    if PROM_HANDLE.get().is_none() {
        let handle = PrometheusBuilder::new().install_recorder()?;
        let _ = PROM_HANDLE.set(handle);
        describe();
    }
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe() {
    describe_counter!("reconciler_ticks_total", "Reconciler cycles by outcome");
    describe_histogram!(
        "reconciler_tick_duration_seconds",
        Unit::Seconds,
        "Wall time of one reconciler cycle"
    );
    describe_counter!("judge_submit_total", "Submit calls to the grading engine by outcome");
    describe_counter!("judge_poll_total", "Poll calls to the grading engine by outcome");
    describe_counter!("code_judge_transitions_total", "Persisted lifecycle transitions by target");
    describe_counter!("announcements_total", "Completion announcements by delivery outcome");
    describe_counter!("store_conflicts_total", "Conditional updates that matched no row");
    describe_counter!("http_requests_total", "HTTP requests by status code");
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request latency by status code"
    );
}
