//! Per-account reentrancy guard for withdraw and redeem.

use std::collections::HashSet;
use tranche_types::Address;

use crate::error::LedgerError;

#[derive(Clone, Debug, Default)]
pub struct ReentrancyGuard {
    in_flight: HashSet<Address>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `account` as in flight; fails if it already is.
    pub fn enter(&mut self, account: &Address) -> Result<(), LedgerError> {
        if !self.in_flight.insert(account.clone()) {
            return Err(LedgerError::Reentrancy(account.clone()));
        }
        Ok(())
    }

    pub fn exit(&mut self, account: &Address) {
        self.in_flight.remove(account);
    }

    pub fn is_entered(&self, account: &Address) -> bool {
        self.in_flight.contains(account)
    }
}
