//! Metrics collection for engine monitoring.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Engine counters.
pub struct Metrics {
    /// Settlements created.
    pub settlements_created: AtomicU64,
    /// Settlements executed.
    pub settlements_executed: AtomicU64,
    /// Settlements cancelled.
    pub settlements_cancelled: AtomicU64,
    /// Approvals recorded.
    pub approvals_recorded: AtomicU64,
    /// Execution attempts that failed on a transfer.
    pub execution_failures: AtomicU64,
    /// Individual flows settled.
    pub flows_settled: AtomicU64,
    /// Native escrow deposits taken into custody.
    pub escrow_deposits: AtomicU64,
    /// Native escrow refunds issued by cancellations.
    pub escrow_refunds: AtomicU64,
}

impl Metrics {
    /// Create a new metrics instance.
    pub fn new() -> Self {
        Self {
            settlements_created: AtomicU64::new(0),
            settlements_executed: AtomicU64::new(0),
            settlements_cancelled: AtomicU64::new(0),
            approvals_recorded: AtomicU64::new(0),
            execution_failures: AtomicU64::new(0),
            flows_settled: AtomicU64::new(0),
            escrow_deposits: AtomicU64::new(0),
            escrow_refunds: AtomicU64::new(0),
        }
    }

    /// Record a settlement creation.
    pub fn settlement_created(&self) {
        self.settlements_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one approval, noting whether it escrowed funds.
    pub fn approval_recorded(&self, escrowed: bool) {
        self.approvals_recorded.fetch_add(1, Ordering::Relaxed);
        if escrowed {
            self.escrow_deposits.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a successful execution of `flows` flows.
    pub fn execution_succeeded(&self, flows: u64) {
        self.settlements_executed.fetch_add(1, Ordering::Relaxed);
        self.flows_settled.fetch_add(flows, Ordering::Relaxed);
    }

    /// Record a failed execution attempt.
    pub fn execution_failed(&self) {
        self.execution_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cancellation that issued `refunds` refunds.
    pub fn settlement_cancelled(&self, refunds: u64) {
        self.settlements_cancelled.fetch_add(1, Ordering::Relaxed);
        self.escrow_refunds.fetch_add(refunds, Ordering::Relaxed);
    }

    /// Snapshot current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            settlements_created: self.settlements_created.load(Ordering::Relaxed),
            settlements_executed: self.settlements_executed.load(Ordering::Relaxed),
            settlements_cancelled: self.settlements_cancelled.load(Ordering::Relaxed),
            approvals_recorded: self.approvals_recorded.load(Ordering::Relaxed),
            execution_failures: self.execution_failures.load(Ordering::Relaxed),
            flows_settled: self.flows_settled.load(Ordering::Relaxed),
            escrow_deposits: self.escrow_deposits.load(Ordering::Relaxed),
            escrow_refunds: self.escrow_refunds.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the engine counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricsSnapshot {
    pub settlements_created: u64,
    pub settlements_executed: u64,
    pub settlements_cancelled: u64,
    pub approvals_recorded: u64,
    pub execution_failures: u64,
    pub flows_settled: u64,
    pub escrow_deposits: u64,
    pub escrow_refunds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.settlement_created();
        metrics.approval_recorded(true);
        metrics.approval_recorded(false);
        metrics.execution_succeeded(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.settlements_created, 1);
        assert_eq!(snapshot.approvals_recorded, 2);
        assert_eq!(snapshot.escrow_deposits, 1);
        assert_eq!(snapshot.flows_settled, 3);
    }
}
