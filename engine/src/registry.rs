//! Settlement registry: record arena and creation-time validation.

use tracing::info;

use bundleswap_assets::AssetCatalog;
use bundleswap_common::{
    AssetKind, AssetUnit, Flow, PartyId, Result, Settlement, SettlementId, SwapError,
};

/// Owns every settlement record, past and present.
///
/// Records live in an arena addressed by a monotonically increasing index;
/// terminal settlements stay queryable for audit.
pub struct SettlementRegistry {
    arena: Vec<Settlement>,
}

impl SettlementRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { arena: Vec::new() }
    }

    /// Insert a new settlement built from validated flows; assigns the
    /// next identifier.
    pub fn insert(&mut self, creator: PartyId, flows: Vec<Flow>, auto_settle: bool) -> SettlementId {
        let id = SettlementId::from_index(self.arena.len() as u64);
        let settlement = Settlement::new(id, creator, flows, auto_settle);
        info!(
            settlement_id = %id,
            flows = settlement.flows().len(),
            approvers = settlement.required_approvers().len(),
            auto_settle,
            "Settlement created"
        );
        self.arena.push(settlement);
        id
    }

    /// Look up a settlement.
    pub fn get(&self, id: SettlementId) -> Result<&Settlement> {
        self.arena
            .get(id.index() as usize)
            .ok_or(SwapError::SettlementNotFound(id))
    }

    /// Look up a settlement for mutation.
    pub fn get_mut(&mut self, id: SettlementId) -> Result<&mut Settlement> {
        self.arena
            .get_mut(id.index() as usize)
            .ok_or(SwapError::SettlementNotFound(id))
    }

    /// Check existence without an error path.
    pub fn contains(&self, id: SettlementId) -> bool {
        (id.index() as usize) < self.arena.len()
    }

    /// Number of settlements ever created.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Check if no settlement was ever created.
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
}

impl Default for SettlementRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a flow set against the structural invariants and the catalog.
///
/// Token flows must reference a contract registered under the right kind;
/// non-fungible contracts must additionally pass the ownership-transfer
/// conformance probe.
pub fn validate_flows(
    flows: &[Flow],
    catalog: &AssetCatalog,
    max_flows: usize,
) -> Result<()> {
    if flows.is_empty() {
        return Err(SwapError::InvalidFlowSet {
            reason: "flow set is empty".to_string(),
        });
    }
    if flows.len() > max_flows {
        return Err(SwapError::InvalidFlowSet {
            reason: format!("{} flows exceed the limit of {max_flows}", flows.len()),
        });
    }

    for flow in flows {
        flow.validate().map_err(|violation| SwapError::InvalidFlowSet {
            reason: violation.to_string(),
        })?;

        match &flow.asset {
            AssetUnit::Native { .. } => {}
            AssetUnit::Fungible { contract, .. } => {
                if catalog.fungible(contract).is_none() {
                    return Err(SwapError::InvalidAssetKind {
                        contract: contract.clone(),
                        expected: AssetKind::Fungible,
                    });
                }
            }
            AssetUnit::NonFungible { contract, .. } => {
                let Some(registry) = catalog.non_fungible(contract) else {
                    return Err(SwapError::InvalidAssetKind {
                        contract: contract.clone(),
                        expected: AssetKind::NonFungible,
                    });
                };
                if !registry.lock().supports_ownership_transfer() {
                    return Err(SwapError::InvalidAssetKind {
                        contract: contract.clone(),
                        expected: AssetKind::NonFungible,
                    });
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundleswap_assets::{DeedRegistry, TokenLedger};
    use bundleswap_common::{ContractId, TokenId};
    use parking_lot::Mutex;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn create_test_catalog() -> AssetCatalog {
        let catalog = AssetCatalog::new();
        catalog.register_fungible(
            ContractId::new("GOLD"),
            Arc::new(Mutex::new(TokenLedger::new("GOLD"))),
        );
        catalog.register_non_fungible(
            ContractId::new("DEEDS"),
            Arc::new(Mutex::new(DeedRegistry::new("DEEDS"))),
        );
        catalog.register_non_fungible(
            ContractId::new("OLD_DEEDS"),
            Arc::new(Mutex::new(DeedRegistry::legacy("OLD_DEEDS"))),
        );
        catalog
    }

    fn gold_flow(from: &str, to: &str) -> Flow {
        Flow::new(
            from,
            to,
            AssetUnit::Fungible {
                contract: ContractId::new("GOLD"),
                amount: Decimal::from(100),
            },
        )
    }

    #[test]
    fn test_identifiers_are_monotonic() {
        let mut registry = SettlementRegistry::new();
        let a = registry.insert(PartyId::new("ALICE"), vec![gold_flow("ALICE", "BOB")], false);
        let b = registry.insert(PartyId::new("ALICE"), vec![gold_flow("ALICE", "BOB")], false);
        assert!(a < b);
        assert!(registry.contains(a));
        assert!(!registry.contains(SettlementId::from_index(99)));
    }

    #[test]
    fn test_validate_rejects_empty_flow_set() {
        let catalog = create_test_catalog();
        let err = validate_flows(&[], &catalog, 64).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_FLOW_SET");
    }

    #[test]
    fn test_validate_rejects_unknown_contract() {
        let catalog = create_test_catalog();
        let flow = Flow::new(
            "ALICE",
            "BOB",
            AssetUnit::Fungible {
                contract: ContractId::new("MISSING"),
                amount: Decimal::ONE,
            },
        );
        let err = validate_flows(&[flow], &catalog, 64).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ASSET_KIND");
    }

    #[test]
    fn test_validate_rejects_kind_mismatch() {
        let catalog = create_test_catalog();
        // GOLD is fungible, referenced as non-fungible
        let flow = Flow::new(
            "ALICE",
            "BOB",
            AssetUnit::NonFungible {
                contract: ContractId::new("GOLD"),
                token: TokenId::new(1),
            },
        );
        let err = validate_flows(&[flow], &catalog, 64).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ASSET_KIND");
    }

    #[test]
    fn test_validate_rejects_non_conformant_nft_contract() {
        let catalog = create_test_catalog();
        let flow = Flow::new(
            "ALICE",
            "BOB",
            AssetUnit::NonFungible {
                contract: ContractId::new("OLD_DEEDS"),
                token: TokenId::new(1),
            },
        );
        let err = validate_flows(&[flow], &catalog, 64).unwrap_err();
        assert!(matches!(err, SwapError::InvalidAssetKind { .. }));
    }

    #[test]
    fn test_validate_enforces_flow_limit() {
        let catalog = create_test_catalog();
        let flows = vec![gold_flow("ALICE", "BOB"), gold_flow("BOB", "CAROL")];
        assert!(validate_flows(&flows, &catalog, 2).is_ok());
        assert!(validate_flows(&flows, &catalog, 1).is_err());
    }
}
