//! Bounded log of published settlement notifications.

use std::collections::VecDeque;

use parking_lot::RwLock;
use tracing::info;

use bundleswap_common::{EventRecord, SettlementEvent, SettlementId};

/// Retains published events for off-chain observers, newest last.
///
/// The log is bounded; once capacity is reached the oldest records are
/// dropped. Queries return point-in-time copies.
pub struct EventLog {
    records: RwLock<VecDeque<EventRecord>>,
    capacity: usize,
}

impl EventLog {
    /// Create an empty log with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            capacity,
        }
    }

    /// Publish one notification.
    pub fn publish(&self, event: SettlementEvent) {
        info!(
            settlement_id = %event.settlement_id(),
            event = event.label(),
            "Settlement event"
        );

        let mut records = self.records.write();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(EventRecord::new(event));
    }

    /// All retained records, oldest first.
    pub fn all(&self) -> Vec<EventRecord> {
        self.records.read().iter().cloned().collect()
    }

    /// Retained records for one settlement, oldest first.
    pub fn for_settlement(&self, id: SettlementId) -> Vec<EventRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| r.event.settlement_id() == id)
            .cloned()
            .collect()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if no record is retained.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
