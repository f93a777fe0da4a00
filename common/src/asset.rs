//! Asset descriptors and transfer flows.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::{ContractId, PartyId, TokenId};

/// The three asset kinds a settlement can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetKind {
    /// The ledger's native currency, held in engine custody once escrowed.
    Native,
    /// A divisible token managed by a fungible asset contract.
    Fungible,
    /// A unique token managed by a non-fungible asset contract.
    NonFungible,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssetKind::Native => "native",
            AssetKind::Fungible => "fungible",
            AssetKind::NonFungible => "non-fungible",
        };
        write!(f, "{s}")
    }
}

/// One unit of value, tagged by asset kind.
///
/// Native units carry only an amount; token units reference the contract
/// that manages them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetUnit {
    /// Native currency amount.
    Native { amount: Decimal },
    /// Fungible token amount at a contract.
    Fungible { contract: ContractId, amount: Decimal },
    /// A specific token at a non-fungible contract.
    NonFungible { contract: ContractId, token: TokenId },
}

impl AssetUnit {
    /// Get the asset kind of this unit.
    pub fn kind(&self) -> AssetKind {
        match self {
            AssetUnit::Native { .. } => AssetKind::Native,
            AssetUnit::Fungible { .. } => AssetKind::Fungible,
            AssetUnit::NonFungible { .. } => AssetKind::NonFungible,
        }
    }

    /// Get the contract reference, if any (absent for native units).
    pub fn contract(&self) -> Option<&ContractId> {
        match self {
            AssetUnit::Native { .. } => None,
            AssetUnit::Fungible { contract, .. } => Some(contract),
            AssetUnit::NonFungible { contract, .. } => Some(contract),
        }
    }

    /// Get the native amount, if this is a native unit.
    pub fn native_amount(&self) -> Option<Decimal> {
        match self {
            AssetUnit::Native { amount } => Some(*amount),
            _ => None,
        }
    }
}

impl fmt::Display for AssetUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetUnit::Native { amount } => write!(f, "{amount} native"),
            AssetUnit::Fungible { contract, amount } => write!(f, "{amount} @{contract}"),
            AssetUnit::NonFungible { contract, token } => write!(f, "{contract}{token}"),
        }
    }
}

/// A single directional obligation within a settlement: `from` owes `to`
/// one asset unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    /// Obligated sender.
    pub from: PartyId,
    /// Recipient.
    pub to: PartyId,
    /// What moves.
    pub asset: AssetUnit,
}

impl Flow {
    /// Create a new flow.
    pub fn new(from: impl Into<PartyId>, to: impl Into<PartyId>, asset: AssetUnit) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            asset,
        }
    }

    /// Check the flow's structural invariants: distinct well-formed
    /// endpoints, positive amounts for divisible assets.
    pub fn validate(&self) -> Result<(), FlowViolation> {
        if !self.from.is_valid() {
            return Err(FlowViolation::MalformedParty(self.from.clone()));
        }
        if !self.to.is_valid() {
            return Err(FlowViolation::MalformedParty(self.to.clone()));
        }
        if self.from == self.to {
            return Err(FlowViolation::SelfTransfer(self.from.clone()));
        }
        match &self.asset {
            AssetUnit::Native { amount } | AssetUnit::Fungible { amount, .. } => {
                if *amount <= Decimal::ZERO {
                    return Err(FlowViolation::NonPositiveAmount(*amount));
                }
            }
            AssetUnit::NonFungible { .. } => {}
        }
        Ok(())
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.from, self.to, self.asset)
    }
}

/// Structural violation detected in a single flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowViolation {
    /// Sender or recipient ID fails format validation.
    #[error("malformed party id: {0}")]
    MalformedParty(PartyId),
    /// Sender and recipient are the same party.
    #[error("self-transfer by {0}")]
    SelfTransfer(PartyId),
    /// Divisible amount is zero or negative.
    #[error("non-positive amount: {0}")]
    NonPositiveAmount(Decimal),
}

/// Failure reported by an asset contract during a transfer or query.
///
/// The engine surfaces these verbatim; it never second-guesses the
/// contract's own checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    /// Sender balance below the transfer amount.
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    /// Operator allowance below the transfer amount.
    #[error("insufficient allowance for {operator}: need {needed}, granted {granted}")]
    InsufficientAllowance {
        operator: PartyId,
        needed: Decimal,
        granted: Decimal,
    },

    /// Token exists but is not owned by the expected party.
    #[error("token {token} is not owned by {party}")]
    NotOwner { token: TokenId, party: PartyId },

    /// Operator lacks transfer authorization for the token.
    #[error("{operator} is not authorized to move token {token}")]
    NotAuthorized { operator: PartyId, token: TokenId },

    /// Token ID unknown to the contract.
    #[error("unknown token {0}")]
    UnknownToken(TokenId),

    /// Contract refused the transfer for its own reasons.
    #[error("transfer rejected by contract: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fungible_unit(amount: i64) -> AssetUnit {
        AssetUnit::Fungible {
            contract: ContractId::new("GOLD"),
            amount: Decimal::from(amount),
        }
    }

    #[test]
    fn test_flow_validation_accepts_well_formed() {
        let flow = Flow::new("ALICE", "BOB", fungible_unit(500));
        assert!(flow.validate().is_ok());
    }

    #[test]
    fn test_flow_rejects_self_transfer() {
        let flow = Flow::new("ALICE", "ALICE", fungible_unit(500));
        assert!(matches!(
            flow.validate(),
            Err(FlowViolation::SelfTransfer(_))
        ));
    }

    #[test]
    fn test_flow_rejects_non_positive_amount() {
        let flow = Flow::new("ALICE", "BOB", fungible_unit(0));
        assert!(matches!(
            flow.validate(),
            Err(FlowViolation::NonPositiveAmount(_))
        ));

        let negative = Flow::new(
            "ALICE",
            "BOB",
            AssetUnit::Native {
                amount: Decimal::from(-1),
            },
        );
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_flow_rejects_malformed_party() {
        let flow = Flow::new("", "BOB", fungible_unit(10));
        assert!(matches!(
            flow.validate(),
            Err(FlowViolation::MalformedParty(_))
        ));
    }

    #[test]
    fn test_nft_flow_has_no_amount_invariant() {
        let flow = Flow::new(
            "ALICE",
            "BOB",
            AssetUnit::NonFungible {
                contract: ContractId::new("DEEDS"),
                token: TokenId::new(1),
            },
        );
        assert!(flow.validate().is_ok());
        assert_eq!(flow.asset.kind(), AssetKind::NonFungible);
    }

    #[test]
    fn test_asset_unit_contract_reference() {
        assert!(AssetUnit::Native {
            amount: Decimal::ONE
        }
        .contract()
        .is_none());
        assert!(fungible_unit(1).contract().is_some());
    }
}
