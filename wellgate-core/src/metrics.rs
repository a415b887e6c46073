//! Wellgate Metrics Module
//!
//! Counter-based metrics for the access gate, XP ledger, redemption
//! engine and weekly pool distributor, with Prometheus text export.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::types::Timestamp;

/// Wellgate metrics collector
pub struct GateMetrics {
    counters: Arc<Counters>,
    start_time: Timestamp,
}

/// Counter metrics (monotonically increasing)
#[derive(Default)]
struct Counters {
    /// Access decisions
    access_free: AtomicU64,
    access_covered: AtomicU64,
    challenges_issued: AtomicU64,

    /// Payment settlement
    payments_settled: AtomicU64,
    settlement_rejections: AtomicU64,
    replay_rejections: AtomicU64,

    /// XP ledger
    xp_awards: AtomicU64,
    xp_granted: AtomicU64,

    /// Redemptions
    redemptions: AtomicU64,
    tokens_redeemed: AtomicU64,
    redemption_rejections: AtomicU64,

    /// Weekly pool
    pools_distributed: AtomicU64,
    pool_tokens_distributed: AtomicU64,
}

/// Point-in-time view of all counters
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub access_free: u64,
    pub access_covered: u64,
    pub challenges_issued: u64,
    pub payments_settled: u64,
    pub settlement_rejections: u64,
    pub replay_rejections: u64,
    pub xp_awards: u64,
    pub xp_granted: u64,
    pub redemptions: u64,
    pub tokens_redeemed: u64,
    pub redemption_rejections: u64,
    pub pools_distributed: u64,
    pub pool_tokens_distributed: u64,
    pub uptime_secs: u64,
}

impl GateMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            start_time: Timestamp::now(),
        }
    }

    pub fn access_free(&self) {
        self.counters.access_free.fetch_add(1, Ordering::Relaxed);
    }

    pub fn access_covered(&self) {
        self.counters.access_covered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn challenge_issued(&self) {
        self.counters.challenges_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn payment_settled(&self) {
        self.counters.payments_settled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn settlement_rejected(&self, replay: bool) {
        self.counters
            .settlement_rejections
            .fetch_add(1, Ordering::Relaxed);
        if replay {
            self.counters.replay_rejections.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn xp_awarded(&self, xp: u64) {
        self.counters.xp_awards.fetch_add(1, Ordering::Relaxed);
        self.counters.xp_granted.fetch_add(xp, Ordering::Relaxed);
    }

    pub fn redemption_completed(&self, tokens: u64) {
        self.counters.redemptions.fetch_add(1, Ordering::Relaxed);
        self.counters.tokens_redeemed.fetch_add(tokens, Ordering::Relaxed);
    }

    pub fn redemption_rejected(&self) {
        self.counters
            .redemption_rejections
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn pool_distributed(&self, tokens: u64) {
        self.counters.pools_distributed.fetch_add(1, Ordering::Relaxed);
        self.counters
            .pool_tokens_distributed
            .fetch_add(tokens, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.counters;
        MetricsSnapshot {
            access_free: c.access_free.load(Ordering::Relaxed),
            access_covered: c.access_covered.load(Ordering::Relaxed),
            challenges_issued: c.challenges_issued.load(Ordering::Relaxed),
            payments_settled: c.payments_settled.load(Ordering::Relaxed),
            settlement_rejections: c.settlement_rejections.load(Ordering::Relaxed),
            replay_rejections: c.replay_rejections.load(Ordering::Relaxed),
            xp_awards: c.xp_awards.load(Ordering::Relaxed),
            xp_granted: c.xp_granted.load(Ordering::Relaxed),
            redemptions: c.redemptions.load(Ordering::Relaxed),
            tokens_redeemed: c.tokens_redeemed.load(Ordering::Relaxed),
            redemption_rejections: c.redemption_rejections.load(Ordering::Relaxed),
            pools_distributed: c.pools_distributed.load(Ordering::Relaxed),
            pool_tokens_distributed: c.pool_tokens_distributed.load(Ordering::Relaxed),
            uptime_secs: {
                let now = Timestamp::now().as_millis();
                let start = self.start_time.as_millis();
                (now.saturating_sub(start)) / 1000
            },
        }
    }

    /// Export metrics in Prometheus format
    pub fn prometheus_export(&self) -> String {
        let snapshot = self.snapshot();
        let mut output = String::new();

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!(
            "wellgate_access_free_total",
            "Accesses granted on the free tier",
            "counter",
            snapshot.access_free
        );
        metric!(
            "wellgate_access_covered_total",
            "Accesses covered by prepaid credits",
            "counter",
            snapshot.access_covered
        );
        metric!(
            "wellgate_challenges_issued_total",
            "Payment challenges issued",
            "counter",
            snapshot.challenges_issued
        );
        metric!(
            "wellgate_payments_settled_total",
            "Payments settled",
            "counter",
            snapshot.payments_settled
        );
        metric!(
            "wellgate_settlement_rejections_total",
            "Settlement attempts rejected",
            "counter",
            snapshot.settlement_rejections
        );
        metric!(
            "wellgate_replay_rejections_total",
            "Settlements rejected as transaction replays",
            "counter",
            snapshot.replay_rejections
        );
        metric!(
            "wellgate_xp_awards_total",
            "XP awards recorded",
            "counter",
            snapshot.xp_awards
        );
        metric!(
            "wellgate_xp_granted_total",
            "XP granted across all awards",
            "counter",
            snapshot.xp_granted
        );
        metric!(
            "wellgate_redemptions_total",
            "Redemptions completed",
            "counter",
            snapshot.redemptions
        );
        metric!(
            "wellgate_tokens_redeemed_total",
            "Tokens paid out through redemptions",
            "counter",
            snapshot.tokens_redeemed
        );
        metric!(
            "wellgate_redemption_rejections_total",
            "Redemptions rejected",
            "counter",
            snapshot.redemption_rejections
        );
        metric!(
            "wellgate_pools_distributed_total",
            "Weekly pools distributed",
            "counter",
            snapshot.pools_distributed
        );
        metric!(
            "wellgate_pool_tokens_total",
            "Tokens distributed from weekly pools",
            "counter",
            snapshot.pool_tokens_distributed
        );
        metric!(
            "wellgate_uptime_seconds",
            "Process uptime in seconds",
            "gauge",
            snapshot.uptime_secs
        );

        output
    }
}

impl Default for GateMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = GateMetrics::new();
        metrics.access_free();
        metrics.access_free();
        metrics.xp_awarded(25);
        metrics.redemption_completed(100);
        metrics.settlement_rejected(true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.access_free, 2);
        assert_eq!(snapshot.xp_granted, 25);
        assert_eq!(snapshot.tokens_redeemed, 100);
        assert_eq!(snapshot.replay_rejections, 1);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = GateMetrics::new();
        metrics.payment_settled();
        let output = metrics.prometheus_export();
        assert!(output.contains("wellgate_payments_settled_total 1"));
        assert!(output.contains("# TYPE wellgate_payments_settled_total counter"));
    }
}
