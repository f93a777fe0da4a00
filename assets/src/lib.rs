//! Bundleswap Asset Contracts
//!
//! The boundary between the settlement engine and the asset contracts it
//! calls: the standard fungible/non-fungible transfer interfaces, the
//! catalog that resolves contract references, and in-memory reference
//! implementations used by tests and the simulator.

pub mod contract;
pub mod catalog;
pub mod fungible;
pub mod nonfungible;

pub use contract::{FungibleToken, NonFungibleToken};
pub use catalog::{AssetCatalog, AssetHandle};
pub use fungible::TokenLedger;
pub use nonfungible::DeedRegistry;
