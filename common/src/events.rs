//! Lifecycle notifications emitted at every settlement transition.
//!
//! These records are the only channel by which off-chain observers learn
//! of state changes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Flow, PartyId, SettlementId};

/// A settlement lifecycle notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementEvent {
    /// Settlement proposed; carries the full flow list.
    Created {
        settlement_id: SettlementId,
        creator: PartyId,
        flows: Vec<Flow>,
    },
    /// One obligated sender approved.
    Approved {
        settlement_id: SettlementId,
        sender: PartyId,
        escrowed: Decimal,
    },
    /// All flows settled; lists the flows actually moved.
    Executed {
        settlement_id: SettlementId,
        flows: Vec<Flow>,
    },
    /// Settlement abandoned; lists the escrow refunds issued.
    Cancelled {
        settlement_id: SettlementId,
        refunds: Vec<(PartyId, Decimal)>,
    },
}

impl SettlementEvent {
    /// The settlement this event belongs to.
    pub fn settlement_id(&self) -> SettlementId {
        match self {
            SettlementEvent::Created { settlement_id, .. }
            | SettlementEvent::Approved { settlement_id, .. }
            | SettlementEvent::Executed { settlement_id, .. }
            | SettlementEvent::Cancelled { settlement_id, .. } => *settlement_id,
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            SettlementEvent::Created { .. } => "created",
            SettlementEvent::Approved { .. } => "approved",
            SettlementEvent::Executed { .. } => "executed",
            SettlementEvent::Cancelled { .. } => "cancelled",
        }
    }
}

/// A published event with audit metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique record ID.
    pub id: Uuid,
    /// When the event was published.
    pub published_at: DateTime<Utc>,
    /// The notification payload.
    pub event: SettlementEvent,
}

impl EventRecord {
    /// Wrap an event with fresh audit metadata.
    pub fn new(event: SettlementEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            published_at: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_settlement_id_accessor() {
        let event = SettlementEvent::Approved {
            settlement_id: SettlementId::from_index(4),
            sender: PartyId::new("BOB"),
            escrowed: Decimal::ZERO,
        };
        assert_eq!(event.settlement_id(), SettlementId::from_index(4));
        assert_eq!(event.label(), "approved");
    }

    #[test]
    fn test_record_carries_fresh_metadata() {
        let event = SettlementEvent::Cancelled {
            settlement_id: SettlementId::from_index(1),
            refunds: vec![],
        };
        let a = EventRecord::new(event.clone());
        let b = EventRecord::new(event);
        assert_ne!(a.id, b.id);
    }
}
