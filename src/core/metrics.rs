use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

pub(crate) const QUIZ_ATTEMPTS_SUBMITTED: &str = "quiz_attempts_submitted_total";
pub(crate) const QUIZ_ATTEMPTS_ABANDONED: &str = "quiz_attempts_abandoned_total";

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);

    metrics::describe_counter!(QUIZ_ATTEMPTS_SUBMITTED, "Quiz attempts graded on submission");
    metrics::describe_counter!(QUIZ_ATTEMPTS_ABANDONED, "Quiz attempts closed without grading");
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}
