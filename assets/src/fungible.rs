//! Reference in-memory fungible token contract.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::debug;

use bundleswap_common::{AssetError, PartyId};

use crate::contract::FungibleToken;

/// An allowance-based fungible token ledger.
///
/// Semantics match the common on-chain standard: balances per holder,
/// allowances per (owner, operator) pair, allowance consumed as it is
/// spent.
pub struct TokenLedger {
    /// Display symbol, used in logs only.
    symbol: String,
    balances: HashMap<PartyId, Decimal>,
    allowances: HashMap<(PartyId, PartyId), Decimal>,
}

impl TokenLedger {
    /// Create an empty ledger.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            balances: HashMap::new(),
            allowances: HashMap::new(),
        }
    }

    /// Credit freshly issued units to `to`.
    pub fn mint(&mut self, to: &PartyId, amount: Decimal) {
        *self.balances.entry(to.clone()).or_insert(Decimal::ZERO) += amount;
    }

    /// Sum of all balances.
    pub fn total_supply(&self) -> Decimal {
        self.balances.values().copied().sum()
    }

    /// Display symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl FungibleToken for TokenLedger {
    fn balance_of(&self, owner: &PartyId) -> Decimal {
        self.balances.get(owner).copied().unwrap_or(Decimal::ZERO)
    }

    fn allowance(&self, owner: &PartyId, operator: &PartyId) -> Decimal {
        self.allowances
            .get(&(owner.clone(), operator.clone()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn approve(&mut self, owner: &PartyId, operator: &PartyId, amount: Decimal) {
        debug!(
            token = %self.symbol,
            owner = %owner,
            operator = %operator,
            amount = %amount,
            "Allowance set"
        );
        self.allowances
            .insert((owner.clone(), operator.clone()), amount);
    }

    fn transfer_from(
        &mut self,
        operator: &PartyId,
        from: &PartyId,
        to: &PartyId,
        amount: Decimal,
    ) -> Result<(), AssetError> {
        // Operator spending someone else's funds consumes allowance
        if operator != from {
            let granted = self.allowance(from, operator);
            if granted < amount {
                return Err(AssetError::InsufficientAllowance {
                    operator: operator.clone(),
                    needed: amount,
                    granted,
                });
            }
        }

        let available = self.balance_of(from);
        if available < amount {
            return Err(AssetError::InsufficientBalance {
                needed: amount,
                available,
            });
        }

        if operator != from {
            let key = (from.clone(), operator.clone());
            if let Some(granted) = self.allowances.get_mut(&key) {
                *granted -= amount;
            }
        }

        *self.balances.entry(from.clone()).or_insert(Decimal::ZERO) -= amount;
        *self.balances.entry(to.clone()).or_insert(Decimal::ZERO) += amount;

        debug!(
            token = %self.symbol,
            from = %from,
            to = %to,
            amount = %amount,
            "Transfer"
        );

        Ok(())
    }
}
