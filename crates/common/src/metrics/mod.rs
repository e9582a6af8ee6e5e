//! Metrics and observability utilities
//!
//! Provides Prometheus metrics for ingestion, LLM traffic and study sessions
//! with standardized naming conventions.

use crate::errors::{AppError, Result};
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Metrics prefix for all PaperMind metrics
pub const METRICS_PREFIX: &str = "papermind";

/// Buckets for LLM call latency (document parsing can take minutes)
pub const LLM_LATENCY_BUCKETS: &[f64] = &[
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
    60.00,  // 1m
    120.0,  // 2m
    300.0,  // 5m
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Ingestion metrics
    describe_counter!(
        format!("{}_papers_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Papers processed by the ingestion pipeline, by outcome"
    );

    describe_counter!(
        format!("{}_concepts_recorded_total", METRICS_PREFIX),
        Unit::Count,
        "Concepts linked to newly ingested papers"
    );

    describe_histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Paper ingestion latency in seconds"
    );

    // LLM metrics
    describe_counter!(
        format!("{}_llm_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total LLM API requests"
    );

    describe_histogram!(
        format!("{}_llm_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "LLM request latency in seconds"
    );

    describe_counter!(
        format!("{}_llm_retries_total", METRICS_PREFIX),
        Unit::Count,
        "LLM calls repeated after malformed output"
    );

    describe_counter!(
        format!("{}_llm_tokens_streamed_total", METRICS_PREFIX),
        Unit::Count,
        "Chat tokens delivered to the user"
    );

    // Study metrics
    describe_counter!(
        format!("{}_assessments_total", METRICS_PREFIX),
        Unit::Count,
        "Knowledge assessment runs, by trigger"
    );

    describe_counter!(
        format!("{}_concepts_assessed_total", METRICS_PREFIX),
        Unit::Count,
        "Concept confidence values written by assessments"
    );

    tracing::info!("Metrics registered");
}

/// Install the Prometheus exporter on `0.0.0.0:{port}`.
///
/// Must be called from within a tokio runtime.
pub fn install_exporter(port: u16) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(LLM_LATENCY_BUCKETS)
        .map_err(|e| AppError::Configuration {
            message: format!("Invalid metrics buckets: {}", e),
        })?
        .install()
        .map_err(|e| AppError::Configuration {
            message: format!("Failed to install metrics exporter: {}", e),
        })?;

    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(())
}

/// Helper to record LLM call metrics
pub struct LlmCallMetrics {
    start: Instant,
    task: String,
    model: String,
}

impl LlmCallMetrics {
    /// Start tracking a call
    pub fn start(task: &str, model: &str) -> Self {
        Self {
            start: Instant::now(),
            task: task.to_string(),
            model: model.to_string(),
        }
    }

    /// Record call completion
    pub fn finish(self, success: bool) {
        let duration = self.start.elapsed().as_secs_f64();
        let status = if success { "success" } else { "error" };

        counter!(
            format!("{}_llm_requests_total", METRICS_PREFIX),
            "task" => self.task.clone(),
            "model" => self.model.clone(),
            "status" => status
        )
        .increment(1);

        histogram!(
            format!("{}_llm_request_duration_seconds", METRICS_PREFIX),
            "task" => self.task,
            "model" => self.model
        )
        .record(duration);
    }
}

/// Helper to record a retry after malformed LLM output
pub fn record_llm_retry(task: &str) {
    counter!(
        format!("{}_llm_retries_total", METRICS_PREFIX),
        "task" => task.to_string()
    )
    .increment(1);
}

/// Helper to record streamed chat tokens
pub fn record_tokens_streamed(agent: &str, tokens: usize) {
    counter!(
        format!("{}_llm_tokens_streamed_total", METRICS_PREFIX),
        "agent" => agent.to_string()
    )
    .increment(tokens as u64);
}

/// Helper to record ingestion metrics
pub fn record_ingestion(duration_secs: f64, outcome: &str, concepts_recorded: usize) {
    counter!(
        format!("{}_papers_ingested_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    counter!(format!("{}_concepts_recorded_total", METRICS_PREFIX))
        .increment(concepts_recorded as u64);

    histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .record(duration_secs);
}

/// Helper to record an assessment run
pub fn record_assessment(trigger: &str, concepts_updated: usize) {
    counter!(
        format!("{}_assessments_total", METRICS_PREFIX),
        "trigger" => trigger.to_string()
    )
    .increment(1);

    counter!(format!("{}_concepts_assessed_total", METRICS_PREFIX))
        .increment(concepts_updated as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        let mut prev = 0.0;
        for &bucket in LLM_LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }

        // Default LLM timeout must fall inside the tracked range
        assert!(LLM_LATENCY_BUCKETS.contains(&120.0));
    }

    #[test]
    fn test_recorders_without_exporter() {
        let metrics = LlmCallMetrics::start("parse_paper", "gpt-4o-mini");
        std::thread::sleep(std::time::Duration::from_millis(5));
        metrics.finish(true);

        record_llm_retry("assess_knowledge");
        record_tokens_streamed("zealot", 12);
        record_ingestion(1.5, "created", 7);
        record_assessment("auto", 3);
    }
}
