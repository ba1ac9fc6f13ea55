//! Holder primitives reachable only through the tranche facades.
//!
//! Every primitive settles the holders it touches against the current
//! index, folds the drift pools into principal, and only then debits or
//! credits. Validation and the underlying transfer happen before anything
//! is written, so a failed call leaves the ledger as it was.

use tracing::{debug, info};
use tranche_math::{gross_for_net, settle_aggregate, MathError};
use tranche_types::{Address, Leg, Timestamp};

use crate::asset::UnderlyingAsset;
use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::gates::Gate;
use crate::ledger::Ledger;

impl<A: UnderlyingAsset> Ledger<A> {
    // ── Deposit side ─────────────────────────────────────────────────────

    /// Pull `assets` of underlying from `sender` and credit `receiver` with
    /// the same amount of each leg, net of the prepaid management fee.
    /// Returns the shares credited per leg.
    pub fn deposit(
        &mut self,
        caller: &Address,
        sender: &Address,
        assets: u128,
        receiver: &Address,
        now: Timestamp,
    ) -> Result<u128, LedgerError> {
        self.leg_of(caller)?;
        if assets == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let shares = self.preview_deposit(assets, now)?;
        self.mint_pairs(sender, receiver, assets, shares, now)?;
        Ok(shares)
    }

    /// Credit exactly `shares` of each leg to `receiver`, pulling whatever
    /// underlying that costs including the fee. Returns the assets pulled.
    pub fn mint(
        &mut self,
        caller: &Address,
        sender: &Address,
        shares: u128,
        receiver: &Address,
        now: Timestamp,
    ) -> Result<u128, LedgerError> {
        self.leg_of(caller)?;
        if shares == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let assets = self.preview_mint(shares, now)?;
        self.mint_pairs(sender, receiver, assets, shares, now)?;
        Ok(assets)
    }

    /// Shares a deposit of `assets` would credit per leg at `now`.
    pub fn preview_deposit(&self, assets: u128, now: Timestamp) -> Result<u128, LedgerError> {
        let fee = self.calculate_management_fee(assets, true, 0, now)?;
        Ok(assets.checked_sub(fee).ok_or(MathError::FeeTooLarge)?)
    }

    /// Underlying a mint of `shares` would pull at `now`.
    pub fn preview_mint(&self, shares: u128, now: Timestamp) -> Result<u128, LedgerError> {
        Ok(gross_for_net(
            shares,
            self.fees.effective_rate(),
            self.remaining_in_interval(now),
        )?)
    }

    /// Largest deposit the gates would admit for `receiver` at `now`.
    pub fn max_deposit(&self, receiver: &Address, now: Timestamp) -> u128 {
        if self.is_tripped(Gate::Deposit) || self.gates.check_sanctions(&[receiver]).is_err() {
            return 0;
        }
        match &self.gates.deposit_limit {
            Some(limit) => limit.remaining(now),
            None => u128::MAX,
        }
    }

    fn mint_pairs(
        &mut self,
        sender: &Address,
        receiver: &Address,
        assets: u128,
        shares: u128,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        if shares == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        self.gates.breakers.check(Gate::Deposit)?;
        self.gates.check_sanctions(&[sender, receiver])?;
        self.gates.check_deposit_limit(assets, now)?;

        let view = self.view_holder(receiver)?;
        let mut snapshot = view.settlement.consolidated();
        let mut supply = settle_aggregate(&self.index, &self.supply)?.consolidated();
        for leg in Leg::BOTH {
            snapshot.credit(leg, shares)?;
            supply.credit(leg, shares)?;
        }
        let custody = self.custody.checked_add(assets).ok_or(MathError::Overflow)?;

        let ledger = self.roles.ledger.clone();
        self.asset.transfer(sender, &ledger, assets)?;

        self.commit_holder(receiver, &view, snapshot);
        self.supply = supply;
        self.custody = custody;
        self.gates.record_deposit(assets, now);

        let fee = assets - shares;
        info!(sender = %sender, receiver = %receiver, assets, shares, fee, "deposit");
        self.emit(LedgerEvent::Deposit {
            sender: sender.clone(),
            receiver: receiver.clone(),
            assets,
            shares,
            fee,
        });
        Ok(())
    }

    // ── Withdraw side ────────────────────────────────────────────────────

    /// Burn `assets` of each leg from `owner` and release the same amount
    /// of underlying to `receiver`. Returns the shares burned per leg.
    pub fn withdraw(
        &mut self,
        caller: &Address,
        sender: &Address,
        assets: u128,
        receiver: &Address,
        owner: &Address,
    ) -> Result<u128, LedgerError> {
        self.leg_of(caller)?;
        self.guarded(owner, |ledger| ledger.burn_pairs(sender, receiver, owner, assets))?;
        Ok(assets)
    }

    /// Burn `shares` of each leg from `owner`; pairs redeem 1:1 for
    /// underlying. Returns the assets released.
    pub fn redeem(
        &mut self,
        caller: &Address,
        sender: &Address,
        shares: u128,
        receiver: &Address,
        owner: &Address,
    ) -> Result<u128, LedgerError> {
        self.leg_of(caller)?;
        self.guarded(owner, |ledger| ledger.burn_pairs(sender, receiver, owner, shares))?;
        Ok(shares)
    }

    /// Pairs `owner` could withdraw or redeem right now.
    pub fn max_withdraw(&self, owner: &Address) -> Result<u128, LedgerError> {
        if self.is_tripped(Gate::Withdraw) {
            return Ok(0);
        }
        let (x, y) = self.balances_of(owner)?;
        Ok(x.min(y))
    }

    fn guarded<T>(
        &mut self,
        account: &Address,
        op: impl FnOnce(&mut Self) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        self.guard.enter(account)?;
        let result = op(self);
        self.guard.exit(account);
        result
    }

    fn burn_pairs(
        &mut self,
        sender: &Address,
        receiver: &Address,
        owner: &Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        self.gates.breakers.check(Gate::Withdraw)?;
        self.gates.check_sanctions(&[owner, receiver])?;

        // A spender burns both legs, so it needs allowance on both.
        let spent = if sender != owner {
            let allowed = Leg::BOTH.map(|leg| self.allowance(leg, owner, sender));
            if allowed.iter().any(|a| *a < amount) {
                return Err(LedgerError::NotShareOwner {
                    owner: owner.clone(),
                    spender: sender.clone(),
                });
            }
            Some(allowed)
        } else {
            None
        };

        let view = self.view_holder(owner)?;
        let max = view.settlement.balance_x.min(view.settlement.balance_y);
        if amount > max {
            return Err(LedgerError::ExceedsMax {
                requested: amount,
                max,
            });
        }
        let mut snapshot = view.settlement.consolidated();
        for leg in Leg::BOTH {
            snapshot
                .debit(leg, amount)
                .ok_or(LedgerError::ExceedsMax { requested: amount, max })?;
        }
        // The aggregate bounds every holder from above.
        let mut supply = settle_aggregate(&self.index, &self.supply)?.consolidated();
        for leg in Leg::BOTH {
            let max = supply.recorded_balance(leg)?;
            supply
                .debit(leg, amount)
                .ok_or(LedgerError::ExceedsMax { requested: amount, max })?;
        }
        if self.custody < amount {
            return Err(LedgerError::InsufficientCustody {
                available: self.custody,
                requested: amount,
            });
        }

        let ledger = self.roles.ledger.clone();
        self.asset.transfer(&ledger, receiver, amount)?;

        self.commit_holder(owner, &view, snapshot);
        self.supply = supply;
        self.custody -= amount;
        if let Some(allowed) = spent {
            for (leg, allowance) in Leg::BOTH.into_iter().zip(allowed) {
                self.spend_allowance(leg, owner, sender, allowance, amount);
            }
        }

        info!(sender = %sender, receiver = %receiver, owner = %owner, amount, "withdraw");
        self.emit(LedgerEvent::Withdraw {
            sender: sender.clone(),
            receiver: receiver.clone(),
            owner: owner.clone(),
            assets: amount,
            shares: amount,
        });
        Ok(())
    }

    // ── Leg transfers ────────────────────────────────────────────────────

    /// Move `amount` of the caller's leg from `from` to `to`.
    pub fn transfer(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let leg = self.leg_of(caller)?;
        self.move_leg(leg, from, to, amount)
    }

    /// Move `amount` of the caller's leg from `from` to `to` on behalf of
    /// `spender`, consuming allowance unless the spender is `from`.
    pub fn transfer_from(
        &mut self,
        caller: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let leg = self.leg_of(caller)?;
        if spender == from {
            return self.move_leg(leg, from, to, amount);
        }
        let allowed = self.allowance(leg, from, spender);
        if allowed < amount {
            return Err(LedgerError::InsufficientAllowance {
                allowed,
                requested: amount,
            });
        }
        self.move_leg(leg, from, to, amount)?;
        self.spend_allowance(leg, from, spender, allowed, amount);
        Ok(())
    }

    /// Set the allowance of `spender` over `owner`'s shares of the caller's leg.
    pub fn approve(
        &mut self,
        caller: &Address,
        owner: &Address,
        spender: &Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let leg = self.leg_of(caller)?;
        self.allowances
            .insert((leg, owner.clone(), spender.clone()), amount);
        debug!(%leg, owner = %owner, spender = %spender, amount, "approval");
        self.emit(LedgerEvent::Approval {
            leg,
            owner: owner.clone(),
            spender: spender.clone(),
            amount,
        });
        Ok(())
    }

    fn spend_allowance(&mut self, leg: Leg, owner: &Address, spender: &Address, allowed: u128, amount: u128) {
        if allowed == u128::MAX {
            return;
        }
        self.allowances
            .insert((leg, owner.clone(), spender.clone()), allowed - amount);
    }

    fn move_leg(&mut self, leg: Leg, from: &Address, to: &Address, amount: u128) -> Result<(), LedgerError> {
        self.gates.breakers.check(Gate::Transfer)?;
        self.gates.check_sanctions(&[from, to])?;

        let from_view = self.view_holder(from)?;
        let available = from_view.settlement.balance(leg);
        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: amount,
            });
        }

        if from == to {
            self.commit_holder(from, &from_view, from_view.settlement.snapshot);
        } else {
            let to_view = self.view_holder(to)?;
            let mut from_snapshot = from_view.settlement.consolidated();
            from_snapshot
                .debit(leg, amount)
                .ok_or(LedgerError::InsufficientBalance {
                    available,
                    requested: amount,
                })?;
            let mut to_snapshot = to_view.settlement.consolidated();
            to_snapshot.credit(leg, amount)?;

            self.commit_holder(from, &from_view, from_snapshot);
            self.commit_holder(to, &to_view, to_snapshot);
        }

        debug!(%leg, from = %from, to = %to, amount, "transfer");
        self.emit(LedgerEvent::Transfer {
            leg,
            from: from.clone(),
            to: to.clone(),
            amount,
        });
        Ok(())
    }
}
