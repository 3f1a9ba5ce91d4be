//! Prometheus metrics for the filter engine

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Statistics level above which per-expression eval counters are resolved.
pub const STATS_LEVEL_EXPR_COUNTERS: u8 = 3;

/// Metrics collection for the filter engine.
pub struct Metrics {
    registry: Registry,
    expr_evals: IntCounterVec,
    records_dropped: IntCounter,
    eval_errors: IntCounter,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        let expr_evals = IntCounterVec::new(
            Opts::new("sift_expr_evals_total", "Expression node evaluations"),
            &["kind"],
        )
        .expect("failed to create expr_evals counter");

        let records_dropped = IntCounter::new(
            "sift_records_dropped_total",
            "Records dropped by filter verdict",
        )
        .expect("failed to create records_dropped counter");

        let eval_errors = IntCounter::new(
            "sift_eval_errors_total",
            "Record evaluations that failed with an error",
        )
        .expect("failed to create eval_errors counter");

        registry
            .register(Box::new(expr_evals.clone()))
            .expect("failed to register expr_evals");
        registry
            .register(Box::new(records_dropped.clone()))
            .expect("failed to register records_dropped");
        registry
            .register(Box::new(eval_errors.clone()))
            .expect("failed to register eval_errors");

        Self {
            registry,
            expr_evals,
            records_dropped,
            eval_errors,
        }
    }

    /// Process-wide instance; counters are shared by every filter program.
    pub fn global() -> &'static Metrics {
        static METRICS: OnceLock<Metrics> = OnceLock::new();
        METRICS.get_or_init(Metrics::new)
    }

    /// Handle to the eval counter of an expression kind. Handles to the
    /// same kind share one underlying counter, so resolving and releasing
    /// them is cheap and idempotent.
    pub fn expr_eval_counter(&self, kind: &str) -> IntCounter {
        self.expr_evals.with_label_values(&[kind])
    }

    pub fn count_dropped_record(&self) {
        self.records_dropped.inc();
    }

    pub fn count_eval_error(&self) {
        self.eval_errors.inc();
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            tracing::error!(error = %e, "failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_counters_share_series_per_kind() {
        let metrics = Metrics::global();
        let a = metrics.expr_eval_counter("metrics_test_kind");
        let b = metrics.expr_eval_counter("metrics_test_kind");
        a.inc();
        b.inc();
        assert_eq!(a.get(), 2);
    }

    #[test]
    fn test_render_contains_registered_families() {
        let metrics = Metrics::global();
        metrics.expr_eval_counter("metrics_test_render").inc();
        let text = metrics.render();
        assert!(text.contains("sift_expr_evals_total"));
    }
}
