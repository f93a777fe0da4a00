//! Standard asset-contract interfaces the engine transfers through.
//!
//! Both traits follow the authorized-operator model: an owner grants a
//! standing authorization to an operator, and the contract itself verifies
//! that authorization at transfer time. The engine performs no checks of
//! its own; whatever the contract reports is surfaced verbatim.

use rust_decimal::Decimal;

use bundleswap_common::{AssetError, PartyId, TokenId};

/// A divisible token contract (balance and allowance based).
///
/// `transfer_from` with `operator == from` is an owner moving its own
/// funds and needs no allowance.
pub trait FungibleToken: Send {
    /// Balance held by `owner`.
    fn balance_of(&self, owner: &PartyId) -> Decimal;

    /// Remaining allowance `owner` has granted to `operator`.
    fn allowance(&self, owner: &PartyId, operator: &PartyId) -> Decimal;

    /// Grant (or overwrite) `operator`'s allowance over `owner`'s funds.
    fn approve(&mut self, owner: &PartyId, operator: &PartyId, amount: Decimal);

    /// Move `amount` from `from` to `to` on `operator`'s authority.
    fn transfer_from(
        &mut self,
        operator: &PartyId,
        from: &PartyId,
        to: &PartyId,
        amount: Decimal,
    ) -> Result<(), AssetError>;
}

/// A unique-token contract (ownership and per-token approval based).
pub trait NonFungibleToken: Send {
    /// Current owner of `token`.
    fn owner_of(&self, token: TokenId) -> Result<PartyId, AssetError>;

    /// Check whether `operator` may move `token`.
    fn is_authorized(&self, operator: &PartyId, token: TokenId) -> bool;

    /// Grant or revoke `operator`'s standing authorization over every
    /// token `owner` holds, now or later.
    fn set_operator(&mut self, owner: &PartyId, operator: &PartyId, granted: bool);

    /// Move `token` from `from` to `to` on `operator`'s authority.
    fn transfer_from(
        &mut self,
        operator: &PartyId,
        from: &PartyId,
        to: &PartyId,
        token: TokenId,
    ) -> Result<(), AssetError>;

    /// Conformance probe: does this contract implement ownership
    /// transfer as specified? Checked once, when a settlement
    /// referencing the contract is created.
    fn supports_ownership_transfer(&self) -> bool;
}
