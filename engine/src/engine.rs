//! The settlement engine facade.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

use bundleswap_assets::AssetCatalog;
use bundleswap_common::{
    EventRecord, Flow, PartyId, Result, Settlement, SettlementEvent, SettlementId,
    SettlementState, SwapError,
};

use crate::config::EngineConfig;
use crate::escrow::EscrowVault;
use crate::events::EventLog;
use crate::executor;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::registry::{self, SettlementRegistry};

/// Mutable engine state, guarded by one mutex.
///
/// The single lock is the serialization discipline: exactly one
/// settlement-affecting operation runs at a time, and each runs to
/// completion (success or total rollback) before the next can observe
/// anything.
struct EngineInner {
    registry: SettlementRegistry,
    vault: EscrowVault,
}

/// The settlement engine: registry, escrow custody, atomic execution,
/// and the notification surface, behind one serialized facade.
pub struct SettlementEngine {
    config: EngineConfig,
    catalog: Arc<AssetCatalog>,
    inner: Mutex<EngineInner>,
    events: EventLog,
    metrics: Metrics,
}

impl SettlementEngine {
    /// Create an engine over the given contract catalog.
    pub fn new(config: EngineConfig, catalog: Arc<AssetCatalog>) -> Self {
        let events = EventLog::new(config.event_log_capacity);
        Self {
            config,
            catalog,
            inner: Mutex::new(EngineInner {
                registry: SettlementRegistry::new(),
                vault: EscrowVault::new(),
            }),
            events,
            metrics: Metrics::new(),
        }
    }

    /// Propose a settlement from the given flows. No assets move.
    ///
    /// Validates flow invariants and, for token flows, that the
    /// referenced contracts are registered under the right kind; a
    /// non-fungible contract must additionally pass the
    /// ownership-transfer conformance probe.
    pub fn create(
        &self,
        creator: impl Into<PartyId>,
        flows: Vec<Flow>,
        auto_settle: bool,
    ) -> Result<SettlementId> {
        registry::validate_flows(&flows, &self.catalog, self.config.max_flows)?;

        let creator = creator.into();
        let mut inner = self.inner.lock();
        let id = inner.registry.insert(creator.clone(), flows.clone(), auto_settle);

        self.events.publish(SettlementEvent::Created {
            settlement_id: id,
            creator,
            flows,
        });
        self.metrics.settlement_created();

        Ok(id)
    }

    /// Record one obligated sender's approval.
    ///
    /// A sender with native obligations must attach exactly their sum;
    /// the amount is taken into custody immediately. Token obligations
    /// rely on a standing contract authorization granted beforehand and
    /// are not verified here.
    ///
    /// If this approval completes the set and the settlement was created
    /// with auto-settle, execution runs synchronously inside the same
    /// operation; a transfer failure then surfaces from this call while
    /// the approval itself (and all escrow) remains recorded.
    pub fn approve(
        &self,
        id: SettlementId,
        sender: impl Into<PartyId>,
        attached_native: Decimal,
    ) -> Result<()> {
        let sender = sender.into();
        let mut inner = self.inner.lock();
        let EngineInner { registry, vault } = &mut *inner;

        let settlement = registry.get_mut(id)?;
        if !settlement.state.is_pending() {
            return Err(SwapError::SettlementNotPending {
                settlement_id: id,
                state: settlement.state,
            });
        }
        if !settlement.is_obligated_sender(&sender) {
            return Err(SwapError::NotAnObligatedSender {
                settlement_id: id,
                party: sender,
            });
        }
        if settlement.has_approved(&sender) {
            return Err(SwapError::DuplicateApproval {
                settlement_id: id,
                party: sender,
            });
        }

        let required = settlement.native_obligation_of(&sender);
        if attached_native != required {
            return Err(SwapError::EscrowAmountMismatch {
                party: sender,
                required,
                attached: attached_native,
            });
        }

        vault.deposit(id, &sender, attached_native);
        settlement.record_approval(sender.clone(), attached_native);

        info!(
            settlement_id = %id,
            sender = %sender,
            escrowed = %attached_native,
            missing = settlement.missing_approvals(),
            "Approval recorded"
        );

        self.events.publish(SettlementEvent::Approved {
            settlement_id: id,
            sender: sender.clone(),
            escrowed: attached_native,
        });
        self.metrics
            .approval_recorded(attached_native > Decimal::ZERO);

        // Last approval triggers execution when the settlement asked for it
        if settlement.is_fully_approved() && settlement.auto_settle {
            return self.execute_locked(registry, vault, id);
        }

        Ok(())
    }

    /// Execute a fully approved settlement. Callable by anyone once the
    /// approval set is complete (unless auto-settle already ran it).
    ///
    /// A failed execution leaves the settlement `Created` with approvals
    /// and escrow intact, ready for a retry once the cause is fixed.
    pub fn execute(&self, id: SettlementId, caller: impl Into<PartyId>) -> Result<()> {
        let caller = caller.into();
        let mut inner = self.inner.lock();
        let EngineInner { registry, vault } = &mut *inner;

        // Existence check first so a missing id is not reported as pending
        registry.get(id)?;

        info!(settlement_id = %id, caller = %caller, "Execution requested");
        self.execute_locked(registry, vault, id)
    }

    /// Cancel a pending settlement and refund all escrow.
    ///
    /// Only the creator or an obligated sender may cancel; cancellation
    /// is unavailable once execution has completed.
    pub fn cancel(&self, id: SettlementId, caller: impl Into<PartyId>) -> Result<()> {
        let caller = caller.into();
        let mut inner = self.inner.lock();
        let EngineInner { registry, vault } = &mut *inner;

        let settlement = registry.get_mut(id)?;
        if !settlement.state.is_pending() {
            return Err(SwapError::SettlementNotPending {
                settlement_id: id,
                state: settlement.state,
            });
        }
        if !settlement.is_participant(&caller) {
            return Err(SwapError::Unauthorized {
                settlement_id: id,
                party: caller,
            });
        }

        settlement
            .transition_to(SettlementState::Cancelled)
            .map_err(|_| SwapError::SettlementNotPending {
                settlement_id: id,
                state: settlement.state,
            })?;

        let refunds = vault.refund_all(id);

        info!(
            settlement_id = %id,
            caller = %caller,
            refunds = refunds.len(),
            "Settlement cancelled"
        );

        self.metrics.settlement_cancelled(refunds.len() as u64);
        self.events.publish(SettlementEvent::Cancelled {
            settlement_id: id,
            refunds,
        });

        Ok(())
    }

    // --- Read-only queries ---

    /// Check if a settlement exists.
    pub fn contains(&self, id: SettlementId) -> bool {
        self.inner.lock().registry.contains(id)
    }

    /// Current lifecycle state.
    pub fn state(&self, id: SettlementId) -> Result<SettlementState> {
        Ok(self.inner.lock().registry.get(id)?.state)
    }

    /// Full flow list in declaration order.
    pub fn flows(&self, id: SettlementId) -> Result<Vec<Flow>> {
        Ok(self.inner.lock().registry.get(id)?.flows().to_vec())
    }

    /// Check whether one sender has approved.
    pub fn has_approved(&self, id: SettlementId, sender: &PartyId) -> Result<bool> {
        Ok(self.inner.lock().registry.get(id)?.has_approved(sender))
    }

    /// Approval status per required sender.
    pub fn approval_status(&self, id: SettlementId) -> Result<Vec<(PartyId, bool)>> {
        Ok(self.inner.lock().registry.get(id)?.approval_status())
    }

    /// Native currency currently escrowed for a settlement.
    pub fn escrowed_total(&self, id: SettlementId) -> Result<Decimal> {
        let inner = self.inner.lock();
        inner.registry.get(id)?;
        Ok(inner.vault.escrowed_for(id))
    }

    /// A full settlement record, cloned for audit.
    pub fn settlement(&self, id: SettlementId) -> Result<Settlement> {
        Ok(self.inner.lock().registry.get(id)?.clone())
    }

    /// Number of settlements ever created.
    pub fn settlement_count(&self) -> usize {
        self.inner.lock().registry.len()
    }

    /// Settled native balance payable to a party (execution payouts and
    /// refunds).
    pub fn native_balance_of(&self, party: &PartyId) -> Decimal {
        self.inner.lock().vault.balance_of(party)
    }

    /// Total native custody across all pending settlements.
    pub fn custody_total(&self) -> Decimal {
        self.inner.lock().vault.custody_total()
    }

    /// All retained event records, oldest first.
    pub fn events(&self) -> Vec<EventRecord> {
        self.events.all()
    }

    /// Retained event records for one settlement.
    pub fn events_for(&self, id: SettlementId) -> Vec<EventRecord> {
        self.events.for_settlement(id)
    }

    /// Snapshot of the engine counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// The engine's custody account identity.
    pub fn custody_account(&self) -> &PartyId {
        &self.config.custody_account
    }

    // --- Private ---

    fn execute_locked(
        &self,
        registry: &mut SettlementRegistry,
        vault: &mut EscrowVault,
        id: SettlementId,
    ) -> Result<()> {
        let settlement = registry.get_mut(id)?;

        match executor::execute(
            settlement,
            vault,
            &self.catalog,
            &self.config.custody_account,
        ) {
            Ok(()) => {
                self.metrics
                    .execution_succeeded(settlement.flows().len() as u64);
                self.events.publish(SettlementEvent::Executed {
                    settlement_id: id,
                    flows: settlement.flows().to_vec(),
                });
                Ok(())
            }
            Err(e) => {
                if matches!(e, SwapError::TransferFailed { .. }) {
                    self.metrics.execution_failed();
                }
                Err(e)
            }
        }
    }
}
