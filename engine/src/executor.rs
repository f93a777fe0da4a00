//! Atomic execution of a fully approved settlement.

use tracing::{info, warn};

use bundleswap_assets::AssetCatalog;
use bundleswap_common::{
    AssetError, PartyId, Result, Settlement, SettlementState, SwapError,
};

use crate::adapter::{TransferAdapter, TransferStep};
use crate::escrow::EscrowVault;

/// Execute every flow of the settlement, all-or-nothing.
///
/// The state transition commits before any asset contract is called, so a
/// reentrant call observes the settlement as no longer pending. Transfers
/// run in two phases over the flows in declaration order: acquire pulls
/// every token flow into engine custody (the point where a sender's
/// missing balance or revoked authorization surfaces), release then pays
/// out escrowed native and pushes custody to recipients. Any failure
/// unwinds the journaled steps in reverse and restores the `Created`
/// state with approvals and escrow intact.
pub fn execute(
    settlement: &mut Settlement,
    vault: &mut EscrowVault,
    catalog: &AssetCatalog,
    custody: &PartyId,
) -> Result<()> {
    if !settlement.state.is_pending() {
        return Err(SwapError::SettlementNotPending {
            settlement_id: settlement.id,
            state: settlement.state,
        });
    }
    if !settlement.is_fully_approved() {
        return Err(SwapError::IncompleteApprovals {
            settlement_id: settlement.id,
            missing: settlement.missing_approvals(),
            required: settlement.required_approvers().len(),
        });
    }

    // Step 1: commit the transition before any external call
    settlement
        .transition_to(SettlementState::Executed)
        .map_err(|_| SwapError::SettlementNotPending {
            settlement_id: settlement.id,
            state: settlement.state,
        })?;

    let mut adapter = TransferAdapter::new(catalog, vault, custody);
    let mut journal: Vec<TransferStep> = Vec::new();

    if let Err((flow_index, source)) = transfer_all(settlement, &mut adapter, &mut journal) {
        warn!(
            settlement_id = %settlement.id,
            flow_index,
            error = %source,
            "Execution failed, unwinding"
        );
        adapter.unwind(journal);
        settlement.revert_to_created();
        return Err(SwapError::TransferFailed {
            settlement_id: settlement.id,
            flow_index,
            source,
        });
    }

    info!(
        settlement_id = %settlement.id,
        flows = settlement.flows().len(),
        "Settlement executed"
    );

    Ok(())
}

/// Run both transfer phases, journaling each completed step.
fn transfer_all(
    settlement: &Settlement,
    adapter: &mut TransferAdapter<'_>,
    journal: &mut Vec<TransferStep>,
) -> std::result::Result<(), (usize, AssetError)> {
    // Acquire: pull token flows into custody
    for (index, flow) in settlement.flows().iter().enumerate() {
        match adapter.acquire(flow) {
            Ok(Some(step)) => journal.push(step),
            Ok(None) => {}
            Err(source) => return Err((index, source)),
        }
    }

    // Release: pay out custody to recipients
    for (index, flow) in settlement.flows().iter().enumerate() {
        match adapter.release(settlement.id, flow) {
            Ok(step) => journal.push(step),
            Err(source) => return Err((index, source)),
        }
    }

    Ok(())
}
