//! Prometheus metrics for a protocol host.
//!
//! [`ProtocolMetrics`] owns a dedicated [`Registry`] that a host can encode
//! into the Prometheus text exposition format with
//! [`ProtocolMetrics::encode`].

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

use crate::NodeError;

pub struct ProtocolMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Rebase records applied to the index (direct and cascaded).
    pub rebases_applied: IntCounter,
    /// Rebase records queued behind a gap.
    pub rebases_scheduled: IntCounter,
    /// Rebase submissions rejected for any reason.
    pub rebases_rejected: IntCounter,
    /// Requests handled by the service, by kind and outcome.
    pub requests: IntCounterVec,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub sequence_number: IntGauge,
    pub queued_rebases: IntGauge,
}

impl ProtocolMetrics {
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        let rebases_applied = register_int_counter_with_registry!(
            Opts::new("tranche_rebases_applied_total", "Rebase records applied"),
            registry
        )?;
        let rebases_scheduled = register_int_counter_with_registry!(
            Opts::new("tranche_rebases_scheduled_total", "Rebase records queued out of order"),
            registry
        )?;
        let rebases_rejected = register_int_counter_with_registry!(
            Opts::new("tranche_rebases_rejected_total", "Rebase submissions rejected"),
            registry
        )?;
        let requests = register_int_counter_vec_with_registry!(
            Opts::new("tranche_requests_total", "Service requests by kind and outcome"),
            &["kind", "outcome"],
            registry
        )?;
        let sequence_number = register_int_gauge_with_registry!(
            Opts::new("tranche_sequence_number", "Last applied rebase sequence number"),
            registry
        )?;
        let queued_rebases = register_int_gauge_with_registry!(
            Opts::new("tranche_queued_rebases", "Rebase records waiting in the queue"),
            registry
        )?;

        Ok(Self {
            registry,
            rebases_applied,
            rebases_scheduled,
            rebases_rejected,
            requests,
            sequence_number,
            queued_rebases,
        })
    }

    pub(crate) fn record_request(&self, kind: &str, ok: bool) {
        let outcome = if ok { "ok" } else { "error" };
        self.requests.with_label_values(&[kind, outcome]).inc();
    }

    /// Text exposition of every registered metric.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_registered_metrics() {
        let metrics = ProtocolMetrics::new().unwrap();
        metrics.rebases_applied.inc_by(3);
        metrics.record_request("deposit", true);
        metrics.sequence_number.set(3);
        let text = metrics.encode().unwrap();
        assert!(text.contains("tranche_rebases_applied_total 3"));
        assert!(text.contains("tranche_requests_total{kind=\"deposit\",outcome=\"ok\"} 1"));
        assert!(text.contains("tranche_sequence_number 3"));
    }

    #[test]
    fn registries_are_independent() {
        let a = ProtocolMetrics::new().unwrap();
        let b = ProtocolMetrics::new().unwrap();
        a.rebases_rejected.inc();
        assert_eq!(b.rebases_rejected.get(), 0);
    }
}
