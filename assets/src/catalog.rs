//! Catalog of registered asset contracts.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::info;

use bundleswap_common::{AssetKind, ContractId};

use crate::contract::{FungibleToken, NonFungibleToken};

/// A registered contract handle, tagged by kind.
#[derive(Clone)]
pub enum AssetHandle {
    /// Fungible token contract.
    Fungible(Arc<Mutex<dyn FungibleToken>>),
    /// Non-fungible token contract.
    NonFungible(Arc<Mutex<dyn NonFungibleToken>>),
}

impl AssetHandle {
    /// The asset kind this handle serves.
    pub fn kind(&self) -> AssetKind {
        match self {
            AssetHandle::Fungible(_) => AssetKind::Fungible,
            AssetHandle::NonFungible(_) => AssetKind::NonFungible,
        }
    }
}

/// Resolves contract references to registered contract handles.
///
/// Registration happens at deployment time; settlement operations only
/// read the catalog.
pub struct AssetCatalog {
    contracts: DashMap<ContractId, AssetHandle>,
}

impl AssetCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            contracts: DashMap::new(),
        }
    }

    /// Register a fungible token contract.
    pub fn register_fungible(
        &self,
        id: ContractId,
        contract: Arc<Mutex<dyn FungibleToken>>,
    ) {
        info!(contract = %id, kind = %AssetKind::Fungible, "Registering asset contract");
        self.contracts.insert(id, AssetHandle::Fungible(contract));
    }

    /// Register a non-fungible token contract.
    pub fn register_non_fungible(
        &self,
        id: ContractId,
        contract: Arc<Mutex<dyn NonFungibleToken>>,
    ) {
        info!(contract = %id, kind = %AssetKind::NonFungible, "Registering asset contract");
        self.contracts
            .insert(id, AssetHandle::NonFungible(contract));
    }

    /// Look up any registered handle.
    pub fn get(&self, id: &ContractId) -> Option<AssetHandle> {
        self.contracts.get(id).map(|h| h.clone())
    }

    /// Look up a fungible contract; `None` if missing or wrong kind.
    pub fn fungible(&self, id: &ContractId) -> Option<Arc<Mutex<dyn FungibleToken>>> {
        match self.get(id)? {
            AssetHandle::Fungible(c) => Some(c),
            AssetHandle::NonFungible(_) => None,
        }
    }

    /// Look up a non-fungible contract; `None` if missing or wrong kind.
    pub fn non_fungible(&self, id: &ContractId) -> Option<Arc<Mutex<dyn NonFungibleToken>>> {
        match self.get(id)? {
            AssetHandle::NonFungible(c) => Some(c),
            AssetHandle::Fungible(_) => None,
        }
    }

    /// Registered kind of a contract, if any.
    pub fn kind_of(&self, id: &ContractId) -> Option<AssetKind> {
        self.contracts.get(id).map(|h| h.kind())
    }

    /// Number of registered contracts.
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

impl Default for AssetCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeedRegistry, TokenLedger};

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
        catalog
    }

    #[test]
    fn test_kind_checked_resolution() {
        let catalog = create_test_catalog();

        assert!(catalog.fungible(&ContractId::new("GOLD")).is_some());
        assert!(catalog.non_fungible(&ContractId::new("GOLD")).is_none());
        assert!(catalog.non_fungible(&ContractId::new("DEEDS")).is_some());
        assert!(catalog.fungible(&ContractId::new("MISSING")).is_none());
    }

    #[test]
    fn test_kind_of() {
        let catalog = create_test_catalog();
        assert_eq!(
            catalog.kind_of(&ContractId::new("GOLD")),
            Some(AssetKind::Fungible)
        );
        assert_eq!(catalog.kind_of(&ContractId::new("MISSING")), None);
    }
}
