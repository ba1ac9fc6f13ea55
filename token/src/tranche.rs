//! The per-leg share token.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tranche_ledger::{Ledger, UnderlyingAsset};
use tranche_math::Settlement;
use tranche_types::{Address, Leg, Timestamp};

use crate::error::TrancheError;

/// Display metadata of a tranche token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrancheMetadata {
    pub name: String,
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    18
}

/// Share token for one leg.
///
/// Balance-affecting calls reach ledger primitives that settle every party
/// against the current index before acting, so amounts are always checked
/// against settled balances. Queries and previews settle in memory the same
/// way, so a caller who queries and then acts sees the same numbers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tranche {
    address: Address,
    leg: Leg,
    metadata: TrancheMetadata,
}

impl Tranche {
    pub fn new(address: Address, leg: Leg, metadata: TrancheMetadata) -> Self {
        Self {
            address,
            leg,
            metadata,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn leg(&self) -> Leg {
        self.leg
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn symbol(&self) -> &str {
        &self.metadata.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.metadata.decimals
    }

    // ── ERC-20 views ─────────────────────────────────────────────────────

    pub fn balance_of<A: UnderlyingAsset>(&self, ledger: &Ledger<A>, holder: &Address) -> Result<u128, TrancheError> {
        Ok(ledger.balance_of(holder, self.leg)?)
    }

    pub fn total_supply<A: UnderlyingAsset>(&self, ledger: &Ledger<A>) -> Result<u128, TrancheError> {
        Ok(ledger.total_supply(self.leg)?)
    }

    pub fn allowance<A: UnderlyingAsset>(&self, ledger: &Ledger<A>, owner: &Address, spender: &Address) -> u128 {
        ledger.allowance(self.leg, owner, spender)
    }

    // ── ERC-20 mutators ──────────────────────────────────────────────────

    pub fn transfer<A: UnderlyingAsset>(
        &self,
        ledger: &mut Ledger<A>,
        sender: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TrancheError> {
        Ok(ledger.transfer(&self.address, sender, to, amount)?)
    }

    pub fn transfer_from<A: UnderlyingAsset>(
        &self,
        ledger: &mut Ledger<A>,
        sender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TrancheError> {
        Ok(ledger.transfer_from(&self.address, sender, from, to, amount)?)
    }

    /// Transfer carrying opaque `data` for the recipient. The ledger does not
    /// interpret it.
    pub fn send<A: UnderlyingAsset>(
        &self,
        ledger: &mut Ledger<A>,
        sender: &Address,
        to: &Address,
        amount: u128,
        data: &[u8],
    ) -> Result<(), TrancheError> {
        ledger.transfer(&self.address, sender, to, amount)?;
        debug!(leg = %self.leg, from = %sender, to = %to, amount, data_len = data.len(), "send");
        Ok(())
    }

    pub fn approve<A: UnderlyingAsset>(
        &self,
        ledger: &mut Ledger<A>,
        owner: &Address,
        spender: &Address,
        amount: u128,
    ) -> Result<(), TrancheError> {
        Ok(ledger.approve(&self.address, owner, spender, amount)?)
    }

    /// Burning is reserved for the wrapper collaborator, which redeems pairs
    /// out of `from` into its own account.
    pub fn burn<A: UnderlyingAsset>(
        &self,
        ledger: &mut Ledger<A>,
        sender: &Address,
        from: &Address,
        amount: u128,
    ) -> Result<u128, TrancheError> {
        if ledger.wrapper() != Some(sender) {
            warn!(leg = %self.leg, sender = %sender, "burn rejected");
            return Err(TrancheError::MethodNotAllowed("burn"));
        }
        Ok(ledger.redeem(&self.address, sender, amount, sender, from)?)
    }

    /// Settle `holder` now and persist the result.
    pub fn settle<A: UnderlyingAsset>(&self, ledger: &mut Ledger<A>, holder: &Address) -> Result<Settlement, TrancheError> {
        Ok(ledger.settle_account(&self.address, holder)?)
    }

    // ── ERC-4626 views ───────────────────────────────────────────────────

    /// The underlying asset.
    pub fn asset<A: UnderlyingAsset>(&self, ledger: &Ledger<A>) -> Address {
        ledger.asset().address()
    }

    /// Underlying backing this leg's supply: one unit per share.
    pub fn total_assets<A: UnderlyingAsset>(&self, ledger: &Ledger<A>) -> Result<u128, TrancheError> {
        self.total_supply(ledger)
    }

    /// Pairs convert to underlying 1:1.
    pub fn convert_to_shares(&self, assets: u128) -> u128 {
        assets
    }

    pub fn convert_to_assets(&self, shares: u128) -> u128 {
        shares
    }

    pub fn max_deposit<A: UnderlyingAsset>(&self, ledger: &Ledger<A>, receiver: &Address, now: Timestamp) -> u128 {
        ledger.max_deposit(receiver, now)
    }

    /// Shares the largest admissible deposit would mint.
    pub fn max_mint<A: UnderlyingAsset>(
        &self,
        ledger: &Ledger<A>,
        receiver: &Address,
        now: Timestamp,
    ) -> Result<u128, TrancheError> {
        match ledger.max_deposit(receiver, now) {
            0 => Ok(0),
            u128::MAX => Ok(u128::MAX),
            assets => Ok(ledger.preview_deposit(assets, now)?),
        }
    }

    pub fn max_withdraw<A: UnderlyingAsset>(&self, ledger: &Ledger<A>, owner: &Address) -> Result<u128, TrancheError> {
        Ok(ledger.max_withdraw(owner)?)
    }

    pub fn max_redeem<A: UnderlyingAsset>(&self, ledger: &Ledger<A>, owner: &Address) -> Result<u128, TrancheError> {
        self.max_withdraw(ledger, owner)
    }

    /// Shares per leg a deposit of `assets` would credit, net of fee.
    pub fn preview_deposit<A: UnderlyingAsset>(
        &self,
        ledger: &Ledger<A>,
        assets: u128,
        now: Timestamp,
    ) -> Result<u128, TrancheError> {
        Ok(ledger.preview_deposit(assets, now)?)
    }

    /// Underlying a mint of `shares` would pull, fee included.
    pub fn preview_mint<A: UnderlyingAsset>(
        &self,
        ledger: &Ledger<A>,
        shares: u128,
        now: Timestamp,
    ) -> Result<u128, TrancheError> {
        Ok(ledger.preview_mint(shares, now)?)
    }

    /// Withdrawals carry no exit fee.
    pub fn preview_withdraw(&self, assets: u128) -> u128 {
        assets
    }

    pub fn preview_redeem(&self, shares: u128) -> u128 {
        shares
    }

    // ── ERC-4626 mutators ────────────────────────────────────────────────

    pub fn deposit<A: UnderlyingAsset>(
        &self,
        ledger: &mut Ledger<A>,
        sender: &Address,
        assets: u128,
        receiver: &Address,
        now: Timestamp,
    ) -> Result<u128, TrancheError> {
        Ok(ledger.deposit(&self.address, sender, assets, receiver, now)?)
    }

    pub fn mint<A: UnderlyingAsset>(
        &self,
        ledger: &mut Ledger<A>,
        sender: &Address,
        shares: u128,
        receiver: &Address,
        now: Timestamp,
    ) -> Result<u128, TrancheError> {
        Ok(ledger.mint(&self.address, sender, shares, receiver, now)?)
    }

    pub fn withdraw<A: UnderlyingAsset>(
        &self,
        ledger: &mut Ledger<A>,
        sender: &Address,
        assets: u128,
        receiver: &Address,
        owner: &Address,
    ) -> Result<u128, TrancheError> {
        Ok(ledger.withdraw(&self.address, sender, assets, receiver, owner)?)
    }

    pub fn redeem<A: UnderlyingAsset>(
        &self,
        ledger: &mut Ledger<A>,
        sender: &Address,
        shares: u128,
        receiver: &Address,
        owner: &Address,
    ) -> Result<u128, TrancheError> {
        Ok(ledger.redeem(&self.address, sender, shares, receiver, owner)?)
    }
}
