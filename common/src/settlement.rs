//! Settlement record and lifecycle state machine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::{Flow, PartyId, SettlementId};

/// Settlement lifecycle state.
///
/// Approvals accumulate while the settlement stays in `Created`; there is
/// no separate approving state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementState {
    /// Proposed and collecting approvals.
    Created,
    /// All flows settled atomically.
    Executed,
    /// Abandoned before execution; escrow refunded.
    Cancelled,
}

impl SettlementState {
    /// Check if this is a terminal state.
    pub fn is_final(&self) -> bool {
        matches!(self, SettlementState::Executed | SettlementState::Cancelled)
    }

    /// Check if the settlement still accepts approvals and execution.
    pub fn is_pending(&self) -> bool {
        matches!(self, SettlementState::Created)
    }

    /// Get valid next states from the current state.
    pub fn valid_transitions(&self) -> &[SettlementState] {
        match self {
            SettlementState::Created => {
                &[SettlementState::Executed, SettlementState::Cancelled]
            }
            SettlementState::Executed => &[],
            SettlementState::Cancelled => &[],
        }
    }

    /// Check if transition to the given state is valid.
    pub fn can_transition_to(&self, next: SettlementState) -> bool {
        self.valid_transitions().contains(&next)
    }
}

/// A recorded approval from one obligated sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    /// When the approval was recorded.
    pub approved_at: DateTime<Utc>,
    /// Native currency taken into custody with this approval.
    pub escrowed: Decimal,
}

/// A complete settlement: an ordered set of flows plus protocol metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    /// Unique settlement identifier.
    pub id: SettlementId,
    /// Party that proposed the settlement.
    pub creator: PartyId,
    /// Execute automatically once the last approval lands.
    pub auto_settle: bool,
    /// Current lifecycle state.
    pub state: SettlementState,
    /// Flows in declaration order.
    flows: Vec<Flow>,
    /// Distinct obligated senders, fixed at creation.
    senders: BTreeSet<PartyId>,
    /// Approvals recorded so far, keyed by sender.
    approvals: HashMap<PartyId, Approval>,
    /// When the settlement was created.
    pub created_at: DateTime<Utc>,
    /// When the settlement was executed (if it was).
    pub executed_at: Option<DateTime<Utc>>,
    /// When the settlement was cancelled (if it was).
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Settlement {
    /// Create a new settlement record in the `Created` state.
    ///
    /// The distinct-sender set is computed here and never changes
    /// afterwards.
    pub fn new(
        id: SettlementId,
        creator: PartyId,
        flows: Vec<Flow>,
        auto_settle: bool,
    ) -> Self {
        let senders = flows.iter().map(|f| f.from.clone()).collect();
        Self {
            id,
            creator,
            auto_settle,
            state: SettlementState::Created,
            flows,
            senders,
            approvals: HashMap::new(),
            created_at: Utc::now(),
            executed_at: None,
            cancelled_at: None,
        }
    }

    /// Flows in declaration order.
    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    /// The fixed set of senders whose approval is required.
    pub fn required_approvers(&self) -> &BTreeSet<PartyId> {
        &self.senders
    }

    /// Check if the party owes anything under this settlement.
    pub fn is_obligated_sender(&self, party: &PartyId) -> bool {
        self.senders.contains(party)
    }

    /// Check if the party may cancel: the creator or any obligated sender.
    pub fn is_participant(&self, party: &PartyId) -> bool {
        *party == self.creator || self.is_obligated_sender(party)
    }

    /// Check if the sender has already approved.
    pub fn has_approved(&self, party: &PartyId) -> bool {
        self.approvals.contains_key(party)
    }

    /// Check if every distinct sender has approved.
    pub fn is_fully_approved(&self) -> bool {
        self.approvals.len() == self.senders.len()
    }

    /// Number of approvals still outstanding.
    pub fn missing_approvals(&self) -> usize {
        self.senders.len() - self.approvals.len()
    }

    /// Sum of the sender's native-currency flow amounts.
    ///
    /// This is exactly what the sender must attach when approving.
    pub fn native_obligation_of(&self, party: &PartyId) -> Decimal {
        self.flows
            .iter()
            .filter(|f| f.from == *party)
            .filter_map(|f| f.asset.native_amount())
            .sum()
    }

    /// Total native currency escrowed so far.
    ///
    /// Always equals the sum of native obligations of approved senders.
    pub fn escrowed_total(&self) -> Decimal {
        self.approvals.values().map(|a| a.escrowed).sum()
    }

    /// Record an approval. The caller has already validated membership,
    /// duplicate status, and the attached escrow amount.
    pub fn record_approval(&mut self, sender: PartyId, escrowed: Decimal) {
        self.approvals.insert(
            sender,
            Approval {
                approved_at: Utc::now(),
                escrowed,
            },
        );
    }

    /// Approval status per required sender.
    pub fn approval_status(&self) -> Vec<(PartyId, bool)> {
        self.senders
            .iter()
            .map(|p| (p.clone(), self.approvals.contains_key(p)))
            .collect()
    }

    /// Transition to a new state, enforcing the lifecycle table.
    pub fn transition_to(&mut self, next: SettlementState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        self.state = next;

        let now = Utc::now();
        match next {
            SettlementState::Executed => self.executed_at = Some(now),
            SettlementState::Cancelled => self.cancelled_at = Some(now),
            SettlementState::Created => {}
        }

        Ok(())
    }

    /// Revert an in-flight execution back to `Created`.
    ///
    /// Only the execution unwind path may call this; the public lifecycle
    /// table treats `Executed` as terminal.
    pub fn revert_to_created(&mut self) {
        self.state = SettlementState::Created;
        self.executed_at = None;
    }
}

/// Error when attempting an invalid state transition.
#[derive(Debug, Clone)]
pub struct InvalidTransition {
    pub from: SettlementState,
    pub to: SettlementState,
}

impl std::fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Invalid state transition from {:?} to {:?}",
            self.from, self.to
        )
    }
}

impl std::error::Error for InvalidTransition {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AssetUnit, ContractId, TokenId};

    fn half_native() -> Decimal {
        Decimal::from_str_exact("0.5").unwrap()
    }

    fn create_test_settlement() -> Settlement {
        let flows = vec![
            Flow::new(
                "ALICE",
                "BOB",
                AssetUnit::NonFungible {
                    contract: ContractId::new("DEEDS"),
                    token: TokenId::new(1),
                },
            ),
            Flow::new(
                "BOB",
                "CAROL",
                AssetUnit::Native {
                    amount: half_native(),
                },
            ),
            Flow::new(
                "CAROL",
                "ALICE",
                AssetUnit::Fungible {
                    contract: ContractId::new("GOLD"),
                    amount: Decimal::from(500),
                },
            ),
        ];
        Settlement::new(SettlementId::from_index(0), PartyId::new("ALICE"), flows, false)
    }

    #[test]
    fn test_distinct_sender_set_computed_at_creation() {
        let settlement = create_test_settlement();
        let senders: Vec<_> = settlement
            .required_approvers()
            .iter()
            .map(|p| p.as_str())
            .collect();
        assert_eq!(senders, vec!["ALICE", "BOB", "CAROL"]);
    }

    #[test]
    fn test_native_obligation_sums_only_native_flows() {
        let settlement = create_test_settlement();
        assert_eq!(
            settlement.native_obligation_of(&PartyId::new("BOB")),
            half_native()
        );
        assert_eq!(
            settlement.native_obligation_of(&PartyId::new("ALICE")),
            Decimal::ZERO
        );
        assert_eq!(
            settlement.native_obligation_of(&PartyId::new("CAROL")),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_escrowed_total_follows_approvals() {
        let mut settlement = create_test_settlement();
        assert_eq!(settlement.escrowed_total(), Decimal::ZERO);

        settlement.record_approval(PartyId::new("BOB"), half_native());
        assert_eq!(settlement.escrowed_total(), half_native());
        assert!(!settlement.is_fully_approved());

        settlement.record_approval(PartyId::new("ALICE"), Decimal::ZERO);
        settlement.record_approval(PartyId::new("CAROL"), Decimal::ZERO);
        assert!(settlement.is_fully_approved());
        assert_eq!(settlement.escrowed_total(), half_native());
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut settlement = create_test_settlement();
        assert!(settlement.state.is_pending());

        assert!(settlement.transition_to(SettlementState::Executed).is_ok());
        assert!(settlement.state.is_final());
        assert!(settlement.executed_at.is_some());

        // Terminal states reject everything
        assert!(settlement
            .transition_to(SettlementState::Cancelled)
            .is_err());
    }

    #[test]
    fn test_revert_restores_pending() {
        let mut settlement = create_test_settlement();
        settlement.transition_to(SettlementState::Executed).unwrap();

        settlement.revert_to_created();
        assert_eq!(settlement.state, SettlementState::Created);
        assert!(settlement.executed_at.is_none());
        assert!(settlement.transition_to(SettlementState::Cancelled).is_ok());
    }

    #[test]
    fn test_participant_check_includes_creator_and_senders() {
        let settlement = create_test_settlement();
        assert!(settlement.is_participant(&PartyId::new("ALICE")));
        assert!(settlement.is_participant(&PartyId::new("BOB")));
        assert!(!settlement.is_participant(&PartyId::new("MALLORY")));
    }
}
