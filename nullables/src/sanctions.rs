//! Nullable sanctions list.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tranche_ledger::SanctionsList;
use tranche_types::Address;

use crate::lock;

/// Deny list editable after installation.
#[derive(Clone, Default)]
pub struct NullSanctions {
    denied: Arc<Mutex<HashSet<Address>>>,
}

impl NullSanctions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny(&self, account: &Address) {
        lock(&self.denied).insert(account.clone());
    }

    pub fn allow(&self, account: &Address) {
        lock(&self.denied).remove(account);
    }
}

impl SanctionsList for NullSanctions {
    fn is_sanctioned(&self, account: &Address) -> bool {
        lock(&self.denied).contains(account)
    }
}
