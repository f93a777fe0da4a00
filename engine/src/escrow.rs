//! Native-currency custody for settlements pending execution.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use tracing::info;

use bundleswap_common::{AssetError, PartyId, SettlementId};

/// Custody ledger for escrowed native currency.
///
/// Funds escrowed for one settlement are attributed to the sender who
/// supplied them and can never be drawn on by another settlement. Paid-out
/// and refunded amounts land in per-party settled balances.
pub struct EscrowVault {
    /// Escrow pots per settlement, attributed per sender.
    escrow: HashMap<SettlementId, BTreeMap<PartyId, Decimal>>,
    /// Settled native balances payable to parties (execution payouts and
    /// cancellation refunds).
    balances: HashMap<PartyId, Decimal>,
}

impl EscrowVault {
    /// Create an empty vault.
    pub fn new() -> Self {
        Self {
            escrow: HashMap::new(),
            balances: HashMap::new(),
        }
    }

    /// Take `amount` from `sender` into custody for `settlement_id`.
    pub fn deposit(&mut self, settlement_id: SettlementId, sender: &PartyId, amount: Decimal) {
        if amount.is_zero() {
            return;
        }
        let pot = self.escrow.entry(settlement_id).or_default();
        *pot.entry(sender.clone()).or_insert(Decimal::ZERO) += amount;
        info!(
            settlement_id = %settlement_id,
            sender = %sender,
            amount = %amount,
            "Native escrow deposited"
        );
    }

    /// Total custody held for one settlement.
    pub fn escrowed_for(&self, settlement_id: SettlementId) -> Decimal {
        self.escrow
            .get(&settlement_id)
            .map(|pot| pot.values().copied().sum())
            .unwrap_or(Decimal::ZERO)
    }

    /// Custody held for one settlement attributed to one sender.
    pub fn escrowed_by(&self, settlement_id: SettlementId, sender: &PartyId) -> Decimal {
        self.escrow
            .get(&settlement_id)
            .and_then(|pot| pot.get(sender).copied())
            .unwrap_or(Decimal::ZERO)
    }

    /// Pay `amount` of `sender`'s escrow for this settlement out to
    /// `recipient`'s settled balance.
    pub fn payout(
        &mut self,
        settlement_id: SettlementId,
        sender: &PartyId,
        recipient: &PartyId,
        amount: Decimal,
    ) -> Result<(), AssetError> {
        let pot = self.escrow.entry(settlement_id).or_default();
        let held = pot.entry(sender.clone()).or_insert(Decimal::ZERO);
        if *held < amount {
            return Err(AssetError::InsufficientBalance {
                needed: amount,
                available: *held,
            });
        }
        *held -= amount;
        if held.is_zero() {
            pot.remove(sender);
        }
        if pot.is_empty() {
            self.escrow.remove(&settlement_id);
        }
        self.credit(recipient, amount);
        Ok(())
    }

    /// Reverse a payout during execution unwind: debit the recipient's
    /// settled balance and restore the sender's escrow attribution.
    pub fn reclaim(
        &mut self,
        settlement_id: SettlementId,
        sender: &PartyId,
        recipient: &PartyId,
        amount: Decimal,
    ) {
        let balance = self
            .balances
            .entry(recipient.clone())
            .or_insert(Decimal::ZERO);
        *balance -= amount;
        let pot = self.escrow.entry(settlement_id).or_default();
        *pot.entry(sender.clone()).or_insert(Decimal::ZERO) += amount;
    }

    /// Return every escrowed amount for this settlement to the sender who
    /// supplied it. Returns the refunds issued.
    pub fn refund_all(&mut self, settlement_id: SettlementId) -> Vec<(PartyId, Decimal)> {
        let Some(pot) = self.escrow.remove(&settlement_id) else {
            return Vec::new();
        };
        let refunds: Vec<(PartyId, Decimal)> = pot.into_iter().collect();
        for (sender, amount) in &refunds {
            self.credit(sender, *amount);
            info!(
                settlement_id = %settlement_id,
                sender = %sender,
                amount = %amount,
                "Native escrow refunded"
            );
        }
        refunds
    }

    /// Settled native balance of a party.
    pub fn balance_of(&self, party: &PartyId) -> Decimal {
        self.balances.get(party).copied().unwrap_or(Decimal::ZERO)
    }

    /// Total native currency currently in escrow across all settlements.
    pub fn custody_total(&self) -> Decimal {
        self.escrow
            .values()
            .flat_map(|pot| pot.values())
            .copied()
            .sum()
    }

    fn credit(&mut self, party: &PartyId, amount: Decimal) {
        *self
            .balances
            .entry(party.clone())
            .or_insert(Decimal::ZERO) += amount;
    }
}

impl Default for EscrowVault {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn half() -> Decimal {
        Decimal::from_str_exact("0.5").unwrap()
    }

    #[test]
    fn test_deposit_and_totals() {
        let mut vault = EscrowVault::new();
        let sid = SettlementId::from_index(0);
        vault.deposit(sid, &PartyId::new("BOB"), half());

        assert_eq!(vault.escrowed_for(sid), half());
        assert_eq!(vault.escrowed_by(sid, &PartyId::new("BOB")), half());
        assert_eq!(vault.custody_total(), half());
    }

    #[test]
    fn test_escrow_is_isolated_per_settlement() {
        let mut vault = EscrowVault::new();
        let a = SettlementId::from_index(0);
        let b = SettlementId::from_index(1);
        vault.deposit(a, &PartyId::new("BOB"), Decimal::from(2));
        vault.deposit(b, &PartyId::new("BOB"), Decimal::from(3));

        // Settlement A cannot draw on settlement B's custody
        let err = vault
            .payout(a, &PartyId::new("BOB"), &PartyId::new("CAROL"), Decimal::from(4))
            .unwrap_err();
        assert!(matches!(err, AssetError::InsufficientBalance { .. }));
        assert_eq!(vault.escrowed_for(b), Decimal::from(3));
    }

    #[test]
    fn test_payout_moves_custody_to_settled_balance() {
        let mut vault = EscrowVault::new();
        let sid = SettlementId::from_index(0);
        vault.deposit(sid, &PartyId::new("BOB"), half());

        vault
            .payout(sid, &PartyId::new("BOB"), &PartyId::new("CAROL"), half())
            .unwrap();

        assert_eq!(vault.escrowed_for(sid), Decimal::ZERO);
        assert_eq!(vault.balance_of(&PartyId::new("CAROL")), half());
        assert_eq!(vault.custody_total(), Decimal::ZERO);
    }

    #[test]
    fn test_reclaim_restores_escrow_attribution() {
        let mut vault = EscrowVault::new();
        let sid = SettlementId::from_index(0);
        let bob = PartyId::new("BOB");
        let carol = PartyId::new("CAROL");

        vault.deposit(sid, &bob, half());
        vault.payout(sid, &bob, &carol, half()).unwrap();
        vault.reclaim(sid, &bob, &carol, half());

        assert_eq!(vault.escrowed_by(sid, &bob), half());
        assert_eq!(vault.balance_of(&carol), Decimal::ZERO);
    }

    #[test]
    fn test_refund_all_returns_exact_deposits() {
        let mut vault = EscrowVault::new();
        let sid = SettlementId::from_index(0);
        vault.deposit(sid, &PartyId::new("BOB"), half());
        vault.deposit(sid, &PartyId::new("DAVE"), Decimal::from(2));

        let refunds = vault.refund_all(sid);
        assert_eq!(refunds.len(), 2);
        assert_eq!(vault.balance_of(&PartyId::new("BOB")), half());
        assert_eq!(vault.balance_of(&PartyId::new("DAVE")), Decimal::from(2));
        assert_eq!(vault.escrowed_for(sid), Decimal::ZERO);

        // Second refund finds nothing
        assert!(vault.refund_all(sid).is_empty());
    }
}
