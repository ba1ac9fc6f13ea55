//! Shared fixtures for the ledger's unit tests.

use std::collections::HashMap;
use tranche_types::{Address, ProtocolParams, RebaseRecord, Timestamp};

use crate::asset::{AssetError, UnderlyingAsset};
use crate::ledger::{Ledger, LedgerRoles};

pub const LEDGER: &str = "ledger";
pub const OWNER: &str = "owner";
pub const SEQUENCER: &str = "sequencer";
pub const TRANCHE_X: &str = "tranche-x";
pub const TRANCHE_Y: &str = "tranche-y";
pub const GENESIS: u64 = 1_000;
pub const DAY: u64 = 86_400;

pub fn addr(raw: &str) -> Address {
    Address::new(raw)
}

#[derive(Default)]
pub struct MemoryAsset {
    pub balances: HashMap<Address, u128>,
}

impl UnderlyingAsset for MemoryAsset {
    fn address(&self) -> Address {
        addr("underlying")
    }

    fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), AssetError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(AssetError::InsufficientFunds {
                account: from.clone(),
                available,
                requested: amount,
            });
        }
        *self.balances.entry(from.clone()).or_default() -= amount;
        *self.balances.entry(to.clone()).or_default() += amount;
        Ok(())
    }
}

pub fn roles() -> LedgerRoles {
    LedgerRoles {
        ledger: addr(LEDGER),
        owner: addr(OWNER),
        sequencer: addr(SEQUENCER),
        tranche_x: addr(TRANCHE_X),
        tranche_y: addr(TRANCHE_Y),
    }
}

pub fn fixture(params: ProtocolParams) -> Ledger<MemoryAsset> {
    Ledger::new(roles(), MemoryAsset::default(), params, Timestamp::new(GENESIS))
        .expect("valid params")
}

pub fn fund(ledger: &mut Ledger<MemoryAsset>, who: &str, amount: u128) {
    *ledger.asset.balances.entry(addr(who)).or_default() += amount;
}

pub fn record(seq: u64, is_natural: bool, underlying: u128, x: u128) -> RebaseRecord {
    RebaseRecord {
        sequence_number: seq,
        is_natural,
        underlying_value: underlying,
        tranche_x_value: x,
    }
}
