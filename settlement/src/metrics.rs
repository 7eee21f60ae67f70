//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `participation_operations_total{event}` - Committed operations by notification kind
//! - `participation_delivery_shortfalls_total` - Claims partially delivered
//! - `participation_settled_tokens_total{kind}` - Whole tokens claimed or compounded

use prometheus::{CounterVec, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Committed operations by kind
    pub operations_total: IntCounterVec,

    /// Partial deliveries (an empty delivery commits nothing and is not counted)
    pub delivery_shortfalls: IntCounter,

    /// Tokens settled by kind (claim / compound)
    pub settled_tokens: CounterVec,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("delivery_shortfalls", &self.delivery_shortfalls.get())
            .finish()
    }
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let operations_total = IntCounterVec::new(
            Opts::new(
                "participation_operations_total",
                "Committed operations by notification kind",
            ),
            &["event"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let delivery_shortfalls = IntCounter::new(
            "participation_delivery_shortfalls_total",
            "Claims partially delivered",
        )?;
        registry.register(Box::new(delivery_shortfalls.clone()))?;

        let settled_tokens = CounterVec::new(
            Opts::new(
                "participation_settled_tokens_total",
                "Whole tokens claimed or compounded",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(settled_tokens.clone()))?;

        Ok(Self {
            operations_total,
            delivery_shortfalls,
            settled_tokens,
            registry,
        })
    }

    /// Record a committed operation
    pub fn record_operation(&self, event: &str) {
        self.operations_total.with_label_values(&[event]).inc();
    }

    /// Record a delivery shortfall
    pub fn record_shortfall(&self) {
        self.delivery_shortfalls.inc();
    }

    /// Record settled tokens
    pub fn record_settled(&self, kind: &str, whole_tokens: f64) {
        if whole_tokens > 0.0 {
            self.settled_tokens.with_label_values(&[kind]).inc_by(whole_tokens);
        }
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.delivery_shortfalls.get(), 0);
        // A second collector does not clash with the first
        Metrics::new().unwrap();
    }

    #[test]
    fn test_record_operation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_operation("deposit");
        metrics.record_operation("deposit");
        metrics.record_operation("claim");

        assert_eq!(metrics.operations_total.with_label_values(&["deposit"]).get(), 2);
        assert_eq!(metrics.operations_total.with_label_values(&["claim"]).get(), 1);
    }

    #[test]
    fn test_record_settled() {
        let metrics = Metrics::new().unwrap();
        metrics.record_settled("claim", 2.5);
        metrics.record_settled("claim", 0.0);
        assert_eq!(metrics.settled_tokens.with_label_values(&["claim"]).get(), 2.5);
    }
}
