//! Reference in-memory non-fungible token contract.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use bundleswap_common::{AssetError, PartyId, TokenId};

use crate::contract::NonFungibleToken;

/// An ownership registry of unique tokens with account-wide operator
/// grants.
///
/// An operator grant is standing: it covers every token its grantor owns,
/// now or later, until revoked. A token changing hands simply falls under
/// the new owner's operator set.
pub struct DeedRegistry {
    /// Display name, used in logs only.
    name: String,
    owners: HashMap<TokenId, PartyId>,
    operators: HashMap<PartyId, HashSet<PartyId>>,
    /// Whether the conformance probe reports ownership-transfer support.
    conformant: bool,
}

impl DeedRegistry {
    /// Create an empty registry.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owners: HashMap::new(),
            operators: HashMap::new(),
            conformant: true,
        }
    }

    /// Create a registry that fails the ownership-transfer conformance
    /// probe, for exercising creation-time validation.
    pub fn legacy(name: impl Into<String>) -> Self {
        Self {
            conformant: false,
            ..Self::new(name)
        }
    }

    /// Issue a new token to `to`.
    pub fn mint(&mut self, to: &PartyId, token: TokenId) {
        self.owners.insert(token, to.clone());
    }

    /// Number of tokens issued.
    pub fn token_count(&self) -> usize {
        self.owners.len()
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl NonFungibleToken for DeedRegistry {
    fn owner_of(&self, token: TokenId) -> Result<PartyId, AssetError> {
        self.owners
            .get(&token)
            .cloned()
            .ok_or(AssetError::UnknownToken(token))
    }

    fn is_authorized(&self, operator: &PartyId, token: TokenId) -> bool {
        match self.owners.get(&token) {
            Some(owner) if owner == operator => true,
            Some(owner) => self
                .operators
                .get(owner)
                .is_some_and(|ops| ops.contains(operator)),
            None => false,
        }
    }

    fn set_operator(&mut self, owner: &PartyId, operator: &PartyId, granted: bool) {
        let ops = self.operators.entry(owner.clone()).or_default();
        if granted {
            ops.insert(operator.clone());
        } else {
            ops.remove(operator);
        }

        debug!(
            registry = %self.name,
            owner = %owner,
            operator = %operator,
            granted,
            "Operator grant changed"
        );
    }

    fn transfer_from(
        &mut self,
        operator: &PartyId,
        from: &PartyId,
        to: &PartyId,
        token: TokenId,
    ) -> Result<(), AssetError> {
        let owner = self.owner_of(token)?;
        if owner != *from {
            return Err(AssetError::NotOwner {
                token,
                party: from.clone(),
            });
        }
        if !self.is_authorized(operator, token) {
            return Err(AssetError::NotAuthorized {
                operator: operator.clone(),
                token,
            });
        }

        self.owners.insert(token, to.clone());

        debug!(
            registry = %self.name,
            from = %from,
            to = %to,
            token = %token,
            "Transfer"
        );

        Ok(())
    }

    fn supports_ownership_transfer(&self) -> bool {
        self.conformant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_registry() -> DeedRegistry {
        let mut registry = DeedRegistry::new("DEEDS");
        registry.mint(&PartyId::new("ALICE"), TokenId::new(1));
        registry
    }

    #[test]
    fn test_owner_can_transfer_directly() {
        let mut registry = create_test_registry();
        let alice = PartyId::new("ALICE");
        let bob = PartyId::new("BOB");

        registry
            .transfer_from(&alice, &alice, &bob, TokenId::new(1))
            .unwrap();
        assert_eq!(registry.owner_of(TokenId::new(1)).unwrap(), bob);
    }

    #[test]
    fn test_operator_needs_a_grant() {
        let mut registry = create_test_registry();
        let alice = PartyId::new("ALICE");
        let bob = PartyId::new("BOB");
        let engine = PartyId::new("ENGINE");

        let err = registry
            .transfer_from(&engine, &alice, &bob, TokenId::new(1))
            .unwrap_err();
        assert!(matches!(err, AssetError::NotAuthorized { .. }));

        registry.set_operator(&alice, &engine, true);
        registry
            .transfer_from(&engine, &alice, &bob, TokenId::new(1))
            .unwrap();
        assert_eq!(registry.owner_of(TokenId::new(1)).unwrap(), bob);
    }

    #[test]
    fn test_grant_is_standing_across_returns() {
        let mut registry = create_test_registry();
        let alice = PartyId::new("ALICE");
        let engine = PartyId::new("ENGINE");

        registry.set_operator(&alice, &engine, true);
        registry
            .transfer_from(&engine, &alice, &engine, TokenId::new(1))
            .unwrap();
        // Token returned to ALICE; her standing grant still covers it
        registry
            .transfer_from(&engine, &engine, &alice, TokenId::new(1))
            .unwrap();
        assert!(registry.is_authorized(&engine, TokenId::new(1)));
    }

    #[test]
    fn test_grant_does_not_cover_other_owners() {
        let mut registry = create_test_registry();
        let alice = PartyId::new("ALICE");
        let bob = PartyId::new("BOB");
        let engine = PartyId::new("ENGINE");

        registry.mint(&bob, TokenId::new(2));
        registry.set_operator(&alice, &engine, true);

        // ALICE's grant says nothing about BOB's tokens
        assert!(!registry.is_authorized(&engine, TokenId::new(2)));
    }

    #[test]
    fn test_revoked_grant_stops_transfers() {
        let mut registry = create_test_registry();
        let alice = PartyId::new("ALICE");
        let bob = PartyId::new("BOB");
        let engine = PartyId::new("ENGINE");

        registry.set_operator(&alice, &engine, true);
        registry.set_operator(&alice, &engine, false);

        let err = registry
            .transfer_from(&engine, &alice, &bob, TokenId::new(1))
            .unwrap_err();
        assert!(matches!(err, AssetError::NotAuthorized { .. }));
    }

    #[test]
    fn test_transfer_from_wrong_owner_fails() {
        let mut registry = create_test_registry();
        let bob = PartyId::new("BOB");
        let carol = PartyId::new("CAROL");

        let err = registry
            .transfer_from(&bob, &bob, &carol, TokenId::new(1))
            .unwrap_err();
        assert!(matches!(err, AssetError::NotOwner { .. }));
    }

    #[test]
    fn test_unknown_token() {
        let registry = create_test_registry();
        assert!(matches!(
            registry.owner_of(TokenId::new(99)),
            Err(AssetError::UnknownToken(_))
        ));
    }

    #[test]
    fn test_legacy_registry_fails_probe() {
        let registry = DeedRegistry::legacy("OLD_DEEDS");
        assert!(!registry.supports_ownership_transfer());
        assert!(DeedRegistry::new("DEEDS").supports_ownership_transfer());
    }
}
