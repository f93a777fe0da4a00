//! Transfer adapter: one dispatch point over the three asset kinds.
//!
//! The adapter moves assets between senders, engine custody, and
//! recipients, and records every completed step so the executor can
//! unwind a partially transferred settlement. It performs no balance or
//! authorization checks of its own; whatever the asset contract reports
//! is surfaced verbatim.

use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::error;

use bundleswap_assets::{AssetCatalog, FungibleToken, NonFungibleToken};
use bundleswap_common::{
    AssetError, AssetUnit, ContractId, Flow, PartyId, SettlementId, TokenId,
};

use crate::escrow::EscrowVault;

/// A completed transfer step, journaled for unwinding.
#[derive(Debug, Clone)]
pub enum TransferStep {
    /// Fungible units pulled from a sender into custody.
    FungiblePulled {
        contract: ContractId,
        from: PartyId,
        amount: Decimal,
    },
    /// A token pulled from a sender into custody.
    TokenPulled {
        contract: ContractId,
        from: PartyId,
        token: TokenId,
    },
    /// Escrowed native currency paid out to a recipient.
    NativePaid {
        settlement_id: SettlementId,
        from: PartyId,
        to: PartyId,
        amount: Decimal,
    },
    /// Fungible units pushed from custody to a recipient.
    FungiblePushed {
        contract: ContractId,
        to: PartyId,
        amount: Decimal,
    },
    /// A token pushed from custody to a recipient.
    TokenPushed {
        contract: ContractId,
        to: PartyId,
        token: TokenId,
    },
}

/// Dispatches flow transfers to the native vault or the referenced asset
/// contract.
pub struct TransferAdapter<'a> {
    catalog: &'a AssetCatalog,
    vault: &'a mut EscrowVault,
    custody: &'a PartyId,
}

impl<'a> TransferAdapter<'a> {
    /// Create an adapter operating as the engine's custody account.
    pub fn new(catalog: &'a AssetCatalog, vault: &'a mut EscrowVault, custody: &'a PartyId) -> Self {
        Self {
            catalog,
            vault,
            custody,
        }
    }

    /// Acquire phase: take the flow's asset into engine custody.
    ///
    /// Token flows pull via the sender's standing authorization, which the
    /// contract itself verifies here. Native flows were escrowed at
    /// approval and need no step.
    pub fn acquire(&mut self, flow: &Flow) -> Result<Option<TransferStep>, AssetError> {
        match &flow.asset {
            AssetUnit::Native { .. } => Ok(None),
            AssetUnit::Fungible { contract, amount } => {
                let ledger = self.fungible(contract)?;
                ledger
                    .lock()
                    .transfer_from(self.custody, &flow.from, self.custody, *amount)?;
                Ok(Some(TransferStep::FungiblePulled {
                    contract: contract.clone(),
                    from: flow.from.clone(),
                    amount: *amount,
                }))
            }
            AssetUnit::NonFungible { contract, token } => {
                let registry = self.non_fungible(contract)?;
                registry
                    .lock()
                    .transfer_from(self.custody, &flow.from, self.custody, *token)?;
                Ok(Some(TransferStep::TokenPulled {
                    contract: contract.clone(),
                    from: flow.from.clone(),
                    token: *token,
                }))
            }
        }
    }

    /// Release phase: move the flow's asset from custody to its
    /// recipient.
    pub fn release(
        &mut self,
        settlement_id: SettlementId,
        flow: &Flow,
    ) -> Result<TransferStep, AssetError> {
        match &flow.asset {
            AssetUnit::Native { amount } => {
                self.vault
                    .payout(settlement_id, &flow.from, &flow.to, *amount)?;
                Ok(TransferStep::NativePaid {
                    settlement_id,
                    from: flow.from.clone(),
                    to: flow.to.clone(),
                    amount: *amount,
                })
            }
            AssetUnit::Fungible { contract, amount } => {
                let ledger = self.fungible(contract)?;
                ledger
                    .lock()
                    .transfer_from(self.custody, self.custody, &flow.to, *amount)?;
                Ok(TransferStep::FungiblePushed {
                    contract: contract.clone(),
                    to: flow.to.clone(),
                    amount: *amount,
                })
            }
            AssetUnit::NonFungible { contract, token } => {
                let registry = self.non_fungible(contract)?;
                registry
                    .lock()
                    .transfer_from(self.custody, self.custody, &flow.to, *token)?;
                Ok(TransferStep::TokenPushed {
                    contract: contract.clone(),
                    to: flow.to.clone(),
                    token: *token,
                })
            }
        }
    }

    /// Undo completed steps, newest first.
    ///
    /// Pull reversals move assets the engine still owns and cannot fail
    /// against a conformant contract; a contract that errors anyway is
    /// logged and skipped so the remaining steps still unwind. A reversed
    /// fungible pull also restores the allowance it consumed, leaving the
    /// sender's standing authorization exactly as it was before the
    /// attempt.
    pub fn unwind(&mut self, journal: Vec<TransferStep>) {
        for step in journal.into_iter().rev() {
            let outcome = match &step {
                TransferStep::FungiblePulled {
                    contract,
                    from,
                    amount,
                } => self.fungible(contract).and_then(|ledger| {
                    let mut ledger = ledger.lock();
                    ledger.transfer_from(self.custody, self.custody, from, *amount)?;
                    let restored = ledger.allowance(from, self.custody) + *amount;
                    ledger.approve(from, self.custody, restored);
                    Ok(())
                }),
                TransferStep::TokenPulled {
                    contract,
                    from,
                    token,
                } => self.non_fungible(contract).and_then(|registry| {
                    registry
                        .lock()
                        .transfer_from(self.custody, self.custody, from, *token)
                }),
                TransferStep::NativePaid {
                    settlement_id,
                    from,
                    to,
                    amount,
                } => {
                    self.vault.reclaim(*settlement_id, from, to, *amount);
                    Ok(())
                }
                TransferStep::FungiblePushed {
                    contract,
                    to,
                    amount,
                } => self.fungible(contract).and_then(|ledger| {
                    ledger
                        .lock()
                        .transfer_from(self.custody, to, self.custody, *amount)
                }),
                TransferStep::TokenPushed {
                    contract,
                    to,
                    token,
                } => self.non_fungible(contract).and_then(|registry| {
                    registry
                        .lock()
                        .transfer_from(self.custody, to, self.custody, *token)
                }),
            };

            if let Err(e) = outcome {
                error!(error = %e, ?step, "Unwind step failed");
            }
        }
    }

    fn fungible(
        &self,
        contract: &ContractId,
    ) -> Result<Arc<Mutex<dyn FungibleToken>>, AssetError> {
        self.catalog
            .fungible(contract)
            .ok_or_else(|| AssetError::Rejected(format!("contract {contract} not registered")))
    }

    fn non_fungible(
        &self,
        contract: &ContractId,
    ) -> Result<Arc<Mutex<dyn NonFungibleToken>>, AssetError> {
        self.catalog
            .non_fungible(contract)
            .ok_or_else(|| AssetError::Rejected(format!("contract {contract} not registered")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundleswap_assets::{FungibleToken, TokenLedger};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn setup() -> (AssetCatalog, Arc<Mutex<TokenLedger>>, EscrowVault, PartyId) {
        let gold = Arc::new(Mutex::new(TokenLedger::new("GOLD")));
        gold.lock().mint(&PartyId::new("CAROL"), Decimal::from(1000));

        let catalog = AssetCatalog::new();
        catalog.register_fungible(ContractId::new("GOLD"), gold.clone());

        (catalog, gold, EscrowVault::new(), PartyId::new("VAULT"))
    }

    fn gold_flow(amount: i64) -> Flow {
        Flow::new(
            "CAROL",
            "ALICE",
            AssetUnit::Fungible {
                contract: ContractId::new("GOLD"),
                amount: Decimal::from(amount),
            },
        )
    }

    #[test]
    fn test_acquire_pulls_into_custody() {
        let (catalog, gold, mut vault, custody) = setup();
        gold.lock()
            .approve(&PartyId::new("CAROL"), &custody, Decimal::from(500));

        let mut adapter = TransferAdapter::new(&catalog, &mut vault, &custody);
        let step = adapter.acquire(&gold_flow(500)).unwrap();
        assert!(matches!(step, Some(TransferStep::FungiblePulled { .. })));
        assert_eq!(gold.lock().balance_of(&custody), Decimal::from(500));
    }

    #[test]
    fn test_acquire_surfaces_contract_failure_verbatim() {
        let (catalog, _gold, mut vault, custody) = setup();

        let mut adapter = TransferAdapter::new(&catalog, &mut vault, &custody);
        let err = adapter.acquire(&gold_flow(500)).unwrap_err();
        assert!(matches!(err, AssetError::InsufficientAllowance { .. }));
    }

    #[test]
    fn test_unwind_returns_pulled_assets() {
        let (catalog, gold, mut vault, custody) = setup();
        let carol = PartyId::new("CAROL");
        gold.lock().approve(&carol, &custody, Decimal::from(500));

        let mut adapter = TransferAdapter::new(&catalog, &mut vault, &custody);
        let step = adapter.acquire(&gold_flow(500)).unwrap().unwrap();
        adapter.unwind(vec![step]);

        assert_eq!(gold.lock().balance_of(&carol), Decimal::from(1000));
        assert_eq!(gold.lock().balance_of(&custody), Decimal::ZERO);
        // The consumed allowance came back too, so a retry needs no
        // fresh grant from the sender
        assert_eq!(gold.lock().allowance(&carol, &custody), Decimal::from(500));
    }
}
