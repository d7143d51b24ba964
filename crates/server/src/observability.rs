//! Prometheus wiring for the `metrics` facade.

use std::time::Duration;

use gateway::{IndexError, PipelineMetrics, SemanticError};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const REQUESTS_TOTAL: &str = "gateway_requests_total";
pub const RATE_LIMITED_TOTAL: &str = "gateway_rate_limited_total";
pub const STAGE_DURATION_SECONDS: &str = "gateway_stage_duration_seconds";

/// Install the global Prometheus recorder. Fails if a recorder is already set.
pub fn install_prometheus() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    metrics::describe_counter!(REQUESTS_TOTAL, "Retrieval requests by outcome");
    metrics::describe_counter!(RATE_LIMITED_TOTAL, "Requests rejected by a rate-limit quota");
    metrics::describe_histogram!(
        STAGE_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Latency of upstream pipeline stages"
    );
    Ok(handle)
}

pub fn record_request(outcome: &'static str) {
    metrics::counter!(REQUESTS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_rate_limited(scope: &'static str) {
    metrics::counter!(RATE_LIMITED_TOTAL, "scope" => scope).increment(1);
}

/// Forwards pipeline stage timings to the `metrics` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusPipelineMetrics;

impl PrometheusPipelineMetrics {
    fn record(stage: &'static str, latency: Duration, ok: bool) {
        let result = if ok { "ok" } else { "error" };
        metrics::histogram!(STAGE_DURATION_SECONDS, "stage" => stage, "result" => result)
            .record(latency.as_secs_f64());
    }
}

impl PipelineMetrics for PrometheusPipelineMetrics {
    fn record_embed(&self, latency: Duration, result: Result<(), SemanticError>) {
        Self::record("embed", latency, result.is_ok());
    }

    fn record_query(&self, latency: Duration, result: Result<(), IndexError>) {
        Self::record("query", latency, result.is_ok());
    }
}
