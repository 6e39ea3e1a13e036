//! Prometheus metrics definitions and textfile export

use std::path::Path;

use chrono::Utc;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram, Counter,
    CounterVec, Encoder, Gauge, Histogram, TextEncoder,
};
use tracing::info;

lazy_static::lazy_static! {
    /// Topics processed, by outcome
    pub static ref TOPICS: CounterVec = register_counter_vec!(
        "kafka_topic_sync_topics_total",
        "Total number of topics processed by outcome",
        &["outcome"]
    ).unwrap();

    /// Topics created because they were absent
    pub static ref TOPICS_CREATED: Counter = register_counter!(
        "kafka_topic_sync_topics_created_total",
        "Total number of topics created"
    ).unwrap();

    /// Broker configs applied
    pub static ref CONFIGS_APPLIED: Counter = register_counter!(
        "kafka_topic_sync_configs_applied_total",
        "Total number of topic configs applied"
    ).unwrap();

    /// Broker configs rejected by the cluster
    pub static ref CONFIGS_REJECTED: Counter = register_counter!(
        "kafka_topic_sync_configs_rejected_total",
        "Total number of topic configs rejected as invalid"
    ).unwrap();

    /// Per-topic reconcile duration
    pub static ref RECONCILE_DURATION: Histogram = register_histogram!(
        "kafka_topic_sync_reconcile_duration_seconds",
        "Duration of a single topic reconciliation in seconds",
        vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    ).unwrap();

    /// End of the last run
    pub static ref LAST_RUN_TIMESTAMP: Gauge = register_gauge!(
        "kafka_topic_sync_last_run_timestamp_seconds",
        "Unix time at which the last run finished"
    ).unwrap();
}

/// Render all registered metrics in the text exposition format
pub fn render() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Stamp the run end and write metrics for the node-exporter textfile collector
///
/// Written to a sibling temp file first and renamed so the collector never
/// reads a partial file.
pub fn write_textfile(path: &Path) -> anyhow::Result<()> {
    LAST_RUN_TIMESTAMP.set(Utc::now().timestamp() as f64);

    let body = render()?;
    let tmp = path.with_extension("prom.tmp");
    std::fs::write(&tmp, body)?;
    std::fs::rename(&tmp, path)?;

    info!(path = %path.display(), "Metrics written");
    Ok(())
}
