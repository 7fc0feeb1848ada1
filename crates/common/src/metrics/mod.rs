//! Metrics for catalog operations
//!
//! Counters and histograms follow the `papershelf_*` naming convention.
//! Without an installed recorder every helper is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all Papershelf metrics
pub const METRICS_PREFIX: &str = "papershelf";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_inference_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Tag inference runs, by outcome"
    );

    describe_counter!(
        format!("{}_tags_inferred_total", METRICS_PREFIX),
        Unit::Count,
        "Tags added to papers by inference"
    );

    describe_histogram!(
        format!("{}_inference_closure_size", METRICS_PREFIX),
        Unit::Count,
        "Number of tags in a computed inference closure"
    );

    describe_counter!(
        format!("{}_approvals_total", METRICS_PREFIX),
        Unit::Count,
        "Entries approved, by entity kind"
    );

    describe_counter!(
        format!("{}_rejections_total", METRICS_PREFIX),
        Unit::Count,
        "Entries rejected (deleted), by entity kind"
    );

    describe_counter!(
        format!("{}_validation_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Rejected form submissions, by error code"
    );

    tracing::info!("Metrics registered");
}

/// Record one inference run over a paper's tags
pub fn record_inference(closure_size: usize, added: usize) {
    let outcome = if added == 0 { "unchanged" } else { "extended" };

    counter!(
        format!("{}_inference_runs_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);

    if added > 0 {
        counter!(format!("{}_tags_inferred_total", METRICS_PREFIX)).increment(added as u64);
    }

    histogram!(format!("{}_inference_closure_size", METRICS_PREFIX)).record(closure_size as f64);
}

pub fn record_approval(kind: &'static str, count: usize) {
    counter!(
        format!("{}_approvals_total", METRICS_PREFIX),
        "entity" => kind
    )
    .increment(count as u64);
}

pub fn record_rejection(kind: &'static str, count: usize) {
    counter!(
        format!("{}_rejections_total", METRICS_PREFIX),
        "entity" => kind
    )
    .increment(count as u64);
}

pub fn record_validation_failure(code: &'static str) {
    counter!(
        format!("{}_validation_failures_total", METRICS_PREFIX),
        "code" => code
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_without_recorder() {
        register_metrics();
        record_inference(4, 2);
        record_inference(4, 0);
        record_approval("tag", 3);
        record_rejection("paper", 1);
        record_validation_failure("invalid_format");
        // Just verify it runs without panic
    }
}
