//! # Prometheus Metrics
//!
//! Operational metrics for the node, scraped at `/metrics` on the metrics
//! port. All metrics live in a dedicated [`prometheus::Registry`] with the
//! `tokenforge` prefix.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Outcome label for a ledger operation that succeeded.
pub const OUTCOME_OK: &str = "ok";

/// Outcome label for a ledger operation that was refused.
pub const OUTCOME_REJECTED: &str = "rejected";

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Tokens created through the factory.
    pub tokens_created_total: IntCounter,
    /// Ledger operations by `op` and `outcome`.
    pub ledger_operations_total: IntCounterVec,
    /// Ledger tokens currently hosted.
    pub tokens_hosted: IntGauge,
    /// Verification jobs started.
    pub verifications_started_total: IntCounter,
    /// Verification jobs that ended verified.
    pub verifications_verified_total: IntCounter,
    /// Verification jobs that ended in any failure, including cancellation.
    pub verifications_failed_total: IntCounter,
    /// Verification jobs not yet terminal.
    pub verifications_active: IntGauge,
    /// Explorer status checks issued by finished jobs.
    pub verification_status_checks_total: IntCounter,
    /// Wall-clock duration of finished verification jobs.
    pub verification_duration_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("tokenforge".into()), None)
            .expect("failed to create prometheus registry");

        let tokens_created_total =
            IntCounter::new("tokens_created_total", "Tokens created through the factory")
                .expect("metric creation");
        registry
            .register(Box::new(tokens_created_total.clone()))
            .expect("metric registration");

        let ledger_operations_total = IntCounterVec::new(
            Opts::new(
                "ledger_operations_total",
                "Ledger operations by operation and outcome",
            ),
            &["op", "outcome"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(ledger_operations_total.clone()))
            .expect("metric registration");

        let tokens_hosted = IntGauge::new("tokens_hosted", "Token ledgers hosted by this node")
            .expect("metric creation");
        registry
            .register(Box::new(tokens_hosted.clone()))
            .expect("metric registration");

        let verifications_started_total = IntCounter::new(
            "verifications_started_total",
            "Verification jobs submitted to the explorer",
        )
        .expect("metric creation");
        registry
            .register(Box::new(verifications_started_total.clone()))
            .expect("metric registration");

        let verifications_verified_total = IntCounter::new(
            "verifications_verified_total",
            "Verification jobs that ended verified",
        )
        .expect("metric creation");
        registry
            .register(Box::new(verifications_verified_total.clone()))
            .expect("metric registration");

        let verifications_failed_total = IntCounter::new(
            "verifications_failed_total",
            "Verification jobs that ended failed, timed out or cancelled",
        )
        .expect("metric creation");
        registry
            .register(Box::new(verifications_failed_total.clone()))
            .expect("metric registration");

        let verifications_active =
            IntGauge::new("verifications_active", "Verification jobs still running")
                .expect("metric creation");
        registry
            .register(Box::new(verifications_active.clone()))
            .expect("metric registration");

        let verification_status_checks_total = IntCounter::new(
            "verification_status_checks_total",
            "Explorer status checks issued by finished verification jobs",
        )
        .expect("metric creation");
        registry
            .register(Box::new(verification_status_checks_total.clone()))
            .expect("metric registration");

        let verification_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "verification_duration_seconds",
                "Time from submission to a terminal verification status",
            )
            .buckets(vec![5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(verification_duration_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            tokens_created_total,
            ledger_operations_total,
            tokens_hosted,
            verifications_started_total,
            verifications_verified_total,
            verifications_failed_total,
            verifications_active,
            verification_status_checks_total,
            verification_duration_seconds,
        }
    }

    /// Counts one ledger operation.
    pub fn record_ledger_op(&self, op: &str, ok: bool) {
        let outcome = if ok { OUTCOME_OK } else { OUTCOME_REJECTED };
        self.ledger_operations_total
            .with_label_values(&[op, outcome])
            .inc();
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
