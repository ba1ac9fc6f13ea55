//! The underlying asset held in custody.

use thiserror::Error;
use tranche_types::Address;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("insufficient underlying balance for {account}: {available} available, {requested} requested")]
    InsufficientFunds {
        account: Address,
        available: u128,
        requested: u128,
    },

    #[error("underlying transfer rejected: {0}")]
    Rejected(String),
}

/// Fungible token the ledger takes custody of.
///
/// A failed transfer must leave both balances untouched.
pub trait UnderlyingAsset: Send {
    /// Address of the asset itself.
    fn address(&self) -> Address;

    fn balance_of(&self, account: &Address) -> u128;

    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), AssetError>;
}

impl<A: UnderlyingAsset + ?Sized> UnderlyingAsset for Box<A> {
    fn address(&self) -> Address {
        (**self).address()
    }

    fn balance_of(&self, account: &Address) -> u128 {
        (**self).balance_of(account)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), AssetError> {
        (**self).transfer(from, to, amount)
    }
}
