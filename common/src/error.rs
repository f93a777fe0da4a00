//! Error types for Bundleswap operations.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{AssetError, AssetKind, ContractId, PartyId, SettlementId, SettlementState};

/// Main error type for settlement operations.
///
/// Every error aborts the whole operation: callers never observe partial
/// state from a failed create, approve, execute, or cancel.
#[derive(Error, Debug)]
pub enum SwapError {
    /// Flow set is structurally invalid (empty, self-transfer,
    /// non-positive amount, malformed party).
    #[error("Invalid flow set: {reason}")]
    InvalidFlowSet { reason: String },

    /// Referenced asset contract is missing or does not conform to the
    /// expected kind's capabilities.
    #[error("Contract {contract} does not satisfy {expected} semantics")]
    InvalidAssetKind {
        contract: ContractId,
        expected: AssetKind,
    },

    /// Settlement not found.
    #[error("Settlement not found: {0}")]
    SettlementNotFound(SettlementId),

    /// Operation attempted outside the `Created` state.
    #[error("Settlement {settlement_id} is {state:?}, not pending")]
    SettlementNotPending {
        settlement_id: SettlementId,
        state: SettlementState,
    },

    /// Approver is not in the settlement's required sender set.
    #[error("{party} is not an obligated sender of settlement {settlement_id}")]
    NotAnObligatedSender {
        settlement_id: SettlementId,
        party: PartyId,
    },

    /// Sender has already approved.
    #[error("{party} has already approved settlement {settlement_id}")]
    DuplicateApproval {
        settlement_id: SettlementId,
        party: PartyId,
    },

    /// Attached native amount does not equal the sender's native
    /// obligation.
    #[error("Escrow mismatch for {party}: required {required}, attached {attached}")]
    EscrowAmountMismatch {
        party: PartyId,
        required: Decimal,
        attached: Decimal,
    },

    /// Execution attempted before every distinct sender approved.
    #[error("Settlement {settlement_id} is missing {missing} of {required} approvals")]
    IncompleteApprovals {
        settlement_id: SettlementId,
        missing: usize,
        required: usize,
    },

    /// An asset contract rejected a transfer during execution.
    #[error("Transfer failed on flow {flow_index} of settlement {settlement_id}: {source}")]
    TransferFailed {
        settlement_id: SettlementId,
        flow_index: usize,
        #[source]
        source: AssetError,
    },

    /// Cancel attempted by a party outside the settlement.
    #[error("{party} may not cancel settlement {settlement_id}")]
    Unauthorized {
        settlement_id: SettlementId,
        party: PartyId,
    },
}

impl SwapError {
    /// Check if the operation can be retried unchanged after the
    /// underlying cause is fixed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SwapError::TransferFailed { .. })
    }

    /// Get error code for logs and wire surfaces.
    pub fn error_code(&self) -> &'static str {
        match self {
            SwapError::InvalidFlowSet { .. } => "INVALID_FLOW_SET",
            SwapError::InvalidAssetKind { .. } => "INVALID_ASSET_KIND",
            SwapError::SettlementNotFound(_) => "SETTLEMENT_NOT_FOUND",
            SwapError::SettlementNotPending { .. } => "SETTLEMENT_NOT_PENDING",
            SwapError::NotAnObligatedSender { .. } => "NOT_AN_OBLIGATED_SENDER",
            SwapError::DuplicateApproval { .. } => "DUPLICATE_APPROVAL",
            SwapError::EscrowAmountMismatch { .. } => "ESCROW_AMOUNT_MISMATCH",
            SwapError::IncompleteApprovals { .. } => "INCOMPLETE_APPROVALS",
            SwapError::TransferFailed { .. } => "TRANSFER_FAILED",
            SwapError::Unauthorized { .. } => "UNAUTHORIZED",
        }
    }
}

/// Result type alias for settlement operations.
pub type Result<T> = std::result::Result<T, SwapError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TokenId;

    #[test]
    fn test_error_codes_are_stable() {
        let err = SwapError::SettlementNotFound(SettlementId::from_index(3));
        assert_eq!(err.error_code(), "SETTLEMENT_NOT_FOUND");

        let err = SwapError::TransferFailed {
            settlement_id: SettlementId::from_index(3),
            flow_index: 1,
            source: AssetError::UnknownToken(TokenId::new(9)),
        };
        assert_eq!(err.error_code(), "TRANSFER_FAILED");
    }

    #[test]
    fn test_only_transfer_failures_are_retryable() {
        let retryable = SwapError::TransferFailed {
            settlement_id: SettlementId::from_index(0),
            flow_index: 0,
            source: AssetError::Rejected("paused".to_string()),
        };
        assert!(retryable.is_retryable());

        let terminal = SwapError::DuplicateApproval {
            settlement_id: SettlementId::from_index(0),
            party: PartyId::new("ALICE"),
        };
        assert!(!terminal.is_retryable());
    }
}
