//! Prometheus metrics for admission decisions.
//!
//! Provides a registry with a decision counter and a latency histogram.
//! Serving `encode()` over HTTP is left to the host process.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabel, EncodeLabelSet, LabelSetEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

use crate::authz::Operation;
use crate::error::AdmissionError;

/// Labels for decision metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct DecisionLabels {
    pub operation: String,
    /// `admitted` or `rejected`
    pub outcome: String,
    /// Error kind for rejections, empty for admissions
    pub reason: String,
}

impl EncodeLabelSet for DecisionLabels {
    fn encode(&self, encoder: &mut LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("operation", self.operation.as_str()).encode(encoder.encode_label())?;
        ("outcome", self.outcome.as_str()).encode(encoder.encode_label())?;
        ("reason", self.reason.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Labels for latency metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct OperationLabels {
    pub operation: String,
}

impl EncodeLabelSet for OperationLabels {
    fn encode(&self, encoder: &mut LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("operation", self.operation.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Shared metrics for the admission service
pub struct Metrics {
    /// Admission decisions by operation, outcome and reason
    pub decisions_total: Family<DecisionLabels, Counter>,
    /// Time spent deciding, including store round trips
    pub decision_duration_seconds: Family<OperationLabels, Histogram>,
    registry: Registry,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let decisions_total = Family::<DecisionLabels, Counter>::default();
        registry.register(
            "cluster_admission_decisions",
            "Total number of cluster admission decisions",
            decisions_total.clone(),
        );

        let decision_duration_seconds =
            Family::<OperationLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(exponential_buckets(0.0005, 2.0, 14))
            });
        registry.register(
            "cluster_admission_decision_duration_seconds",
            "Duration of cluster admission decisions in seconds",
            decision_duration_seconds.clone(),
        );

        Self {
            decisions_total,
            decision_duration_seconds,
            registry,
        }
    }

    /// Record an admitted request
    pub fn record_admitted(&self, operation: Operation, duration_secs: f64) {
        self.record(operation, "admitted", "", duration_secs);
    }

    /// Record a rejected request
    pub fn record_rejected(&self, operation: Operation, error: &AdmissionError, duration_secs: f64) {
        self.record(operation, "rejected", error.kind().as_str(), duration_secs);
    }

    /// Current count for one label set
    pub fn decision_count(&self, operation: Operation, outcome: &str, reason: &str) -> u64 {
        self.decisions_total
            .get_or_create(&DecisionLabels {
                operation: operation.to_string(),
                outcome: outcome.to_string(),
                reason: reason.to_string(),
            })
            .get()
    }

    fn record(&self, operation: Operation, outcome: &str, reason: &str, duration_secs: f64) {
        let labels = DecisionLabels {
            operation: operation.to_string(),
            outcome: outcome.to_string(),
            reason: reason.to_string(),
        };
        self.decisions_total.get_or_create(&labels).inc();
        self.decision_duration_seconds
            .get_or_create(&OperationLabels {
                operation: operation.to_string(),
            })
            .observe(duration_secs);
    }

    /// Encode metrics to Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if encode(&mut buffer, &self.registry).is_err() {
            tracing::error!("Failed to encode metrics");
            return "# Error encoding metrics".to_string();
        }
        buffer
    }
}
