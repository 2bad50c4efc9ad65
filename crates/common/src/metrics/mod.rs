//! Metrics and observability utilities
//!
//! Prometheus-style metrics under a common prefix. Recording is a no-op
//! until a recorder is installed, so library code can call these freely.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all repository metrics
pub const METRICS_PREFIX: &str = "gsr";

/// Latency buckets in seconds; the tail covers large PDF downloads
pub const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

fn metric_name(suffix: &str) -> String {
    format!("{METRICS_PREFIX}_{suffix}")
}

const COUNTERS: &[(&str, Unit, &str)] = &[
    ("requests_total", Unit::Count, "Total number of HTTP requests"),
    ("search_queries_total", Unit::Count, "Total number of listing and search queries"),
    ("submissions_total", Unit::Count, "Paper submissions by outcome"),
    ("downloads_total", Unit::Count, "Paper downloads by outcome"),
    ("download_bytes_total", Unit::Bytes, "Bytes served by paper downloads"),
    ("cache_hits_total", Unit::Count, "Total cache hits"),
    ("cache_misses_total", Unit::Count, "Total cache misses"),
    ("rate_limited_total", Unit::Count, "Requests rejected by the rate limiter"),
];

const HISTOGRAMS: &[(&str, Unit, &str)] = &[
    ("request_duration_seconds", Unit::Seconds, "HTTP request latency in seconds"),
    ("search_duration_seconds", Unit::Seconds, "Listing query latency in seconds"),
    ("search_results_count", Unit::Count, "Number of papers matched by a listing query"),
];

/// Register all metric descriptions
pub fn register_metrics() {
    for &(name, unit, description) in COUNTERS {
        describe_counter!(metric_name(name), unit, description);
    }
    for &(name, unit, description) in HISTOGRAMS {
        describe_histogram!(metric_name(name), unit, description);
    }

    tracing::info!(
        counters = COUNTERS.len(),
        histograms = HISTOGRAMS.len(),
        "Metrics registered"
    );
}

/// Times one HTTP request from middleware entry to response
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            metric_name("requests_total"),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            metric_name("request_duration_seconds"),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record a listing query. `mode` is "server" or "client" paging.
pub fn record_search(duration_secs: f64, mode: &str, result_count: u64, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        metric_name("search_queries_total"),
        "mode" => mode.to_string(),
        "status" => status
    )
    .increment(1);

    histogram!(
        metric_name("search_duration_seconds"),
        "mode" => mode.to_string()
    )
    .record(duration_secs);

    if success {
        histogram!(
            metric_name("search_results_count"),
            "mode" => mode.to_string()
        )
        .record(result_count as f64);
    }
}

/// Record a submission outcome ("created", "invalid", "saved_for_retry", ...)
pub fn record_submission(outcome: &str) {
    counter!(
        metric_name("submissions_total"),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a download attempt
pub fn record_download(outcome: &str, bytes: usize) {
    counter!(
        metric_name("downloads_total"),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    if bytes > 0 {
        counter!(metric_name("download_bytes_total")).increment(bytes as u64);
    }
}

/// Count a cache lookup against `cache_name`
pub fn record_cache(hit: bool, cache_name: &str) {
    let name = if hit { "cache_hits_total" } else { "cache_misses_total" };
    counter!(metric_name(name), "cache" => cache_name.to_string()).increment(1);
}

pub fn record_rate_limited(endpoint: &str) {
    counter!(
        metric_name("rate_limited_total"),
        "endpoint" => endpoint.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets_sorted() {
        assert!(LATENCY_BUCKETS.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_metric_name_prefix() {
        assert_eq!(metric_name("downloads_total"), "gsr_downloads_total");
    }

    #[test]
    fn test_recording_without_recorder() {
        let metrics = RequestMetrics::start("GET", "/v2/papers");
        metrics.finish(200);
        record_search(0.01, "server", 3, true);
        record_submission("created");
        record_download("served", 1024);
        record_cache(false, "listing");
        record_rate_limited("/v2/papers");
    }
}
