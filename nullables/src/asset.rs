//! Nullable underlying asset: an in-memory fungible token.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tranche_ledger::{AssetError, UnderlyingAsset};
use tranche_types::Address;

use crate::lock;

#[derive(Default)]
struct Balances {
    accounts: HashMap<Address, u128>,
    rejecting: bool,
}

/// In-memory fungible token.
///
/// Hand one clone to the ledger and keep another to fund accounts and
/// inspect balances from the test.
#[derive(Clone)]
pub struct NullAsset {
    address: Address,
    state: Arc<Mutex<Balances>>,
}

impl NullAsset {
    pub fn new(address: impl Into<Address>) -> Self {
        Self {
            address: address.into(),
            state: Arc::new(Mutex::new(Balances::default())),
        }
    }

    /// Credit `amount` out of thin air.
    pub fn mint(&self, account: &Address, amount: u128) {
        *lock(&self.state).accounts.entry(account.clone()).or_default() += amount;
    }

    pub fn balance(&self, account: &Address) -> u128 {
        lock(&self.state).accounts.get(account).copied().unwrap_or(0)
    }

    /// Sum of all balances.
    pub fn total(&self) -> u128 {
        lock(&self.state).accounts.values().sum()
    }

    /// Make every subsequent transfer fail, as a paused token would.
    pub fn set_rejecting(&self, rejecting: bool) {
        lock(&self.state).rejecting = rejecting;
    }
}

impl UnderlyingAsset for NullAsset {
    fn address(&self) -> Address {
        self.address.clone()
    }

    fn balance_of(&self, account: &Address) -> u128 {
        self.balance(account)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), AssetError> {
        let mut state = lock(&self.state);
        if state.rejecting {
            return Err(AssetError::Rejected("transfers paused".into()));
        }
        let available = state.accounts.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(AssetError::InsufficientFunds {
                account: from.clone(),
                available,
                requested: amount,
            });
        }
        state.accounts.insert(from.clone(), available - amount);
        *state.accounts.entry(to.clone()).or_default() += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_moves_funds() {
        let mut asset = NullAsset::new("usdc");
        let (a, b) = (Address::new("a"), Address::new("b"));
        asset.mint(&a, 10);
        asset.transfer(&a, &b, 4).unwrap();
        assert_eq!(asset.balance(&a), 6);
        assert_eq!(asset.balance_of(&b), 4);
        assert_eq!(asset.total(), 10);
    }

    #[test]
    fn overdraft_and_pause_fail() {
        let mut asset = NullAsset::new("usdc");
        let (a, b) = (Address::new("a"), Address::new("b"));
        asset.mint(&a, 1);
        assert!(matches!(
            asset.transfer(&a, &b, 2),
            Err(AssetError::InsufficientFunds { available: 1, .. })
        ));
        let handle = asset.clone();
        handle.set_rejecting(true);
        assert!(matches!(asset.transfer(&a, &b, 1), Err(AssetError::Rejected(_))));
    }
}
