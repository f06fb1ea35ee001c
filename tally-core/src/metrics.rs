//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//! Each [`Metrics`] owns its registry, so several ledgers can live in one
//! process (tests, multi-tenant hosts) without name clashes.
//!
//! # Metrics
//!
//! - `tally_votes_total` - Votes that changed a counter
//! - `tally_vote_flips_total` - Votes that switched polarity
//! - `tally_vote_noops_total` - Re-asserted votes (no write)
//! - `tally_donations_total` - Committed donations
//! - `tally_conflicts_total` - Atomic units aborted by lock contention
//! - `tally_operation_duration_seconds` - Latency of write operations

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Votes that changed a counter
    pub votes_total: IntCounter,

    /// Votes that switched polarity
    pub vote_flips: IntCounter,

    /// Re-asserted votes
    pub vote_noops: IntCounter,

    /// Committed donations
    pub donations_total: IntCounter,

    /// Aborted atomic units
    pub conflicts_total: IntCounter,

    /// Write latency histogram
    pub operation_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("votes_total", &self.votes_total.get())
            .field("donations_total", &self.donations_total.get())
            .field("conflicts_total", &self.conflicts_total.get())
            .finish()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let votes_total = IntCounter::new("tally_votes_total", "Votes that changed a counter")?;
        registry.register(Box::new(votes_total.clone()))?;

        let vote_flips =
            IntCounter::new("tally_vote_flips_total", "Votes that switched polarity")?;
        registry.register(Box::new(vote_flips.clone()))?;

        let vote_noops =
            IntCounter::new("tally_vote_noops_total", "Re-asserted votes without a write")?;
        registry.register(Box::new(vote_noops.clone()))?;

        let donations_total = IntCounter::new("tally_donations_total", "Committed donations")?;
        registry.register(Box::new(donations_total.clone()))?;

        let conflicts_total = IntCounter::new(
            "tally_conflicts_total",
            "Atomic units aborted by lock contention",
        )?;
        registry.register(Box::new(conflicts_total.clone()))?;

        let operation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "tally_operation_duration_seconds",
                "Latency of vote and donation writes",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 1.0]),
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(Self {
            votes_total,
            vote_flips,
            vote_noops,
            donations_total,
            conflicts_total,
            operation_duration,
            registry,
        })
    }

    /// Record a vote by the counter delta it applied
    pub fn record_vote(&self, delta: i64) {
        match delta {
            0 => self.vote_noops.inc(),
            1 | -1 => self.votes_total.inc(),
            _ => {
                self.votes_total.inc();
                self.vote_flips.inc();
            }
        }
    }

    /// Record a committed donation
    pub fn record_donation(&self) {
        self.donations_total.inc();
    }

    /// Record an aborted atomic unit
    pub fn record_conflict(&self) {
        self.conflicts_total.inc();
    }

    /// Record write duration
    pub fn record_duration(&self, duration_seconds: f64) {
        self.operation_duration.observe(duration_seconds);
    }

    /// Render in the Prometheus text exposition format
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.votes_total.get(), 0);
        assert_eq!(metrics.donations_total.get(), 0);
    }

    #[test]
    fn test_independent_registries() {
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();
        first.record_donation();
        assert_eq!(first.donations_total.get(), 1);
        assert_eq!(second.donations_total.get(), 0);
    }

    #[test]
    fn test_record_vote() {
        let metrics = Metrics::new().unwrap();
        metrics.record_vote(1);
        metrics.record_vote(-2);
        metrics.record_vote(0);

        assert_eq!(metrics.votes_total.get(), 2);
        assert_eq!(metrics.vote_flips.get(), 1);
        assert_eq!(metrics.vote_noops.get(), 1);
    }

    #[test]
    fn test_render() {
        let metrics = Metrics::new().unwrap();
        metrics.record_conflict();
        metrics.record_duration(0.002);

        let text = metrics.render();
        assert!(text.contains("tally_conflicts_total 1"));
        assert!(text.contains("tally_operation_duration_seconds_bucket"));
    }
}
