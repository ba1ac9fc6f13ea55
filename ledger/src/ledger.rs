//! Ledger state, queries and owner administration.

use std::collections::HashMap;
use tracing::{debug, info};
use tranche_math::{
    management_fee, settle_across, settle_aggregate, FeeParameters, GlobalIndex, Settlement, UserSnapshot,
};
use tranche_types::{Address, Leg, ProtocolParams, RateLimitParams, Timestamp};

use crate::asset::UnderlyingAsset;
use crate::error::LedgerError;
use crate::events::{EventBus, LedgerEvent};
use crate::gates::{DepositRateLimit, Gate, Gates, SanctionsList};
use crate::guard::ReentrancyGuard;
use crate::queue::{RebaseQueue, ScheduledRebase};

/// The accounts a ledger trusts, fixed at creation except where the owner
/// rotates them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerRoles {
    /// The ledger's own custody account on the underlying asset.
    pub ledger: Address,
    pub owner: Address,
    pub sequencer: Address,
    pub tranche_x: Address,
    pub tranche_y: Address,
}

/// A holder settled in memory but not yet persisted.
#[derive(Clone, Copy, Debug)]
pub(crate) struct HolderView {
    pub settlement: Settlement,
    pub old_balance_x: u128,
    pub old_balance_y: u128,
    pub was_empty: bool,
}

pub struct Ledger<A: UnderlyingAsset> {
    pub(crate) roles: LedgerRoles,
    pub(crate) wrapper: Option<Address>,
    pub(crate) params: ProtocolParams,
    pub(crate) fees: FeeParameters,
    /// Fees are prepaid up to here; a rebase at or past it charges the
    /// intervals due.
    pub(crate) fee_horizon: Timestamp,
    pub(crate) index: GlobalIndex,
    /// Last index of every closed epoch, by epoch number.
    pub(crate) epochs: Vec<GlobalIndex>,
    /// Upper bound of every holder's claims, settled upwards on each
    /// rebase. Always holds pairs.
    pub(crate) supply: UserSnapshot,
    pub(crate) holders: HashMap<Address, UserSnapshot>,
    /// Bumped on every holder write; checkpoints compare against it.
    pub(crate) holder_writes: u64,
    pub(crate) allowances: HashMap<(Leg, Address, Address), u128>,
    pub(crate) queue: RebaseQueue,
    pub(crate) gates: Gates,
    pub(crate) guard: ReentrancyGuard,
    pub(crate) asset: A,
    /// Underlying held on behalf of holders plus collected-but-unclaimed fees.
    pub(crate) custody: u128,
    pub(crate) events: Vec<LedgerEvent>,
    pub(crate) bus: EventBus,
}

impl<A: UnderlyingAsset> Ledger<A> {
    /// Create a ledger whose natural-rebase schedule starts at `genesis`.
    pub fn new(
        roles: LedgerRoles,
        asset: A,
        params: ProtocolParams,
        genesis: Timestamp,
    ) -> Result<Self, LedgerError> {
        params.validate()?;
        let index = GlobalIndex::genesis(genesis);
        let fees = FeeParameters {
            rate_per_day_bps: params.management_fee_rate_bps_per_day,
            enabled: params.management_fees_enabled,
        };
        info!(
            ledger = %roles.ledger,
            owner = %roles.owner,
            interval_secs = params.rebase_interval_secs,
            fee_rate_bps = fees.rate_per_day_bps,
            fees_enabled = fees.enabled,
            "ledger created"
        );
        Ok(Self {
            wrapper: None,
            fee_horizon: index.next_natural_rebase(params.rebase_interval_secs),
            epochs: Vec::new(),
            supply: UserSnapshot::empty(index),
            holders: HashMap::new(),
            holder_writes: 0,
            allowances: HashMap::new(),
            queue: RebaseQueue::new(params.max_scheduled_rebases),
            gates: Gates::new(params.deposit_rate_limit),
            guard: ReentrancyGuard::new(),
            custody: 0,
            events: Vec::new(),
            bus: EventBus::new(),
            roles,
            asset,
            params,
            fees,
            index,
        })
    }

    // ── Access ───────────────────────────────────────────────────────────

    /// Which leg `caller` is the facade for.
    pub(crate) fn leg_of(&self, caller: &Address) -> Result<Leg, LedgerError> {
        if *caller == self.roles.tranche_x {
            Ok(Leg::X)
        } else if *caller == self.roles.tranche_y {
            Ok(Leg::Y)
        } else {
            Err(LedgerError::NotTranche(caller.clone()))
        }
    }

    pub(crate) fn require_owner(&self, caller: &Address) -> Result<(), LedgerError> {
        if *caller != self.roles.owner {
            return Err(LedgerError::Unauthorized(caller.clone()));
        }
        Ok(())
    }

    pub(crate) fn require_sequencer(&self, caller: &Address) -> Result<(), LedgerError> {
        if *caller != self.roles.sequencer {
            return Err(LedgerError::NotSequencer(caller.clone()));
        }
        Ok(())
    }

    // ── Settlement plumbing ──────────────────────────────────────────────

    pub(crate) fn snapshot_or_empty(&self, holder: &Address) -> UserSnapshot {
        self.holders
            .get(holder)
            .copied()
            .unwrap_or_else(|| UserSnapshot::empty(self.index))
    }

    /// Settle `holder` against the current index without persisting.
    pub(crate) fn view_holder(&self, holder: &Address) -> Result<HolderView, LedgerError> {
        let snapshot = self.snapshot_or_empty(holder);
        Ok(HolderView {
            settlement: settle_across(&self.index, &self.epochs, &snapshot)?,
            old_balance_x: snapshot.recorded_balance(Leg::X)?,
            old_balance_y: snapshot.recorded_balance(Leg::Y)?,
            was_empty: snapshot.is_zero(),
        })
    }

    /// Persist `snapshot` for `holder` and announce the settlement if the
    /// index had moved under a non-empty position.
    pub(crate) fn commit_holder(&mut self, holder: &Address, view: &HolderView, snapshot: UserSnapshot) {
        if view.settlement.changed && !view.was_empty {
            debug!(
                holder = %holder,
                old_x = view.old_balance_x,
                old_y = view.old_balance_y,
                new_x = view.settlement.balance_x,
                new_y = view.settlement.balance_y,
                "settlement applied"
            );
            self.emit(LedgerEvent::RebaseApplied {
                holder: holder.clone(),
                old_balance_x: view.old_balance_x,
                old_balance_y: view.old_balance_y,
                new_balance_x: view.settlement.balance_x,
                new_balance_y: view.settlement.balance_y,
            });
        }
        self.holders.insert(holder.clone(), snapshot);
        self.holder_writes += 1;
    }

    /// Settle `holder`, persist the result and return the settled balances.
    ///
    /// Only the tranche facades may force a settlement.
    pub fn settle_account(&mut self, caller: &Address, holder: &Address) -> Result<Settlement, LedgerError> {
        self.leg_of(caller)?;
        let view = self.view_holder(holder)?;
        if view.settlement.changed {
            self.commit_holder(holder, &view, view.settlement.snapshot);
        }
        Ok(view.settlement)
    }

    pub(crate) fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn address(&self) -> &Address {
        &self.roles.ledger
    }

    pub fn owner(&self) -> &Address {
        &self.roles.owner
    }

    pub fn sequencer(&self) -> &Address {
        &self.roles.sequencer
    }

    pub fn tranche(&self, leg: Leg) -> &Address {
        match leg {
            Leg::X => &self.roles.tranche_x,
            Leg::Y => &self.roles.tranche_y,
        }
    }

    pub fn wrapper(&self) -> Option<&Address> {
        self.wrapper.as_ref()
    }

    pub fn asset(&self) -> &A {
        &self.asset
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn fee_parameters(&self) -> FeeParameters {
        self.fees
    }

    pub fn fee_horizon(&self) -> Timestamp {
        self.fee_horizon
    }

    pub fn global_index(&self) -> &GlobalIndex {
        &self.index
    }

    /// Last index of each closed renormalization epoch.
    pub fn closed_epochs(&self) -> &[GlobalIndex] {
        &self.epochs
    }

    /// Settled balance of `holder` on `leg`, as if settlement had happened.
    pub fn balance_of(&self, holder: &Address, leg: Leg) -> Result<u128, LedgerError> {
        Ok(self.view_holder(holder)?.settlement.balance(leg))
    }

    /// Both settled balances of `holder`.
    pub fn balances_of(&self, holder: &Address) -> Result<(u128, u128), LedgerError> {
        let s = self.view_holder(holder)?.settlement;
        Ok((s.balance_x, s.balance_y))
    }

    /// The stored, possibly stale, snapshot of `holder`.
    pub fn snapshot(&self, holder: &Address) -> Option<&UserSnapshot> {
        self.holders.get(holder)
    }

    /// Supply of `leg`. Never below the sum of the holders' settled
    /// balances; may exceed it by rounding dust.
    pub fn total_supply(&self, leg: Leg) -> Result<u128, LedgerError> {
        Ok(settle_aggregate(&self.index, &self.supply)?.balance(leg))
    }

    pub fn allowance(&self, leg: Leg, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(&(leg, owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Last applied sequence number.
    pub fn rebase_number(&self) -> u64 {
        self.index.sequence_number
    }

    pub fn next_sequence_number(&self) -> u64 {
        self.index.next_sequence_number()
    }

    /// Schedule anchor of the last natural rebase.
    pub fn last_time_stamp(&self) -> Timestamp {
        self.index.last_natural_rebase
    }

    /// Earliest time the next natural rebase is accepted.
    pub fn next_natural_rebase(&self) -> Timestamp {
        self.index.next_natural_rebase(self.params.rebase_interval_secs)
    }

    pub fn scheduled_rebase(&self, sequence_number: u64) -> Option<&ScheduledRebase> {
        self.queue.get(sequence_number)
    }

    pub fn scheduled_rebases(&self) -> &RebaseQueue {
        &self.queue
    }

    /// Fee on `amount` for the time left until the next natural rebase.
    ///
    /// With `use_default_rate` the current fee parameters apply (zero while
    /// fees are disabled); otherwise `rate_override` in bps/day.
    pub fn calculate_management_fee(
        &self,
        amount: u128,
        use_default_rate: bool,
        rate_override: u128,
        now: Timestamp,
    ) -> Result<u128, LedgerError> {
        let rate = if use_default_rate {
            self.fees.effective_rate()
        } else {
            if rate_override >= ProtocolParams::FEE_DENOMINATOR {
                return Err(LedgerError::InvalidFeeRate(rate_override));
            }
            rate_override
        };
        Ok(management_fee(amount, rate, self.remaining_in_interval(now))?)
    }

    /// Seconds from `now` to the next natural rebase, capped at one interval.
    pub(crate) fn remaining_in_interval(&self, now: Timestamp) -> u64 {
        now.elapsed_since(self.next_natural_rebase())
            .min(self.params.rebase_interval_secs)
    }

    /// Underlying held in custody.
    pub fn custody(&self) -> u128 {
        self.custody
    }

    /// Custody not backing any outstanding pair: deposit fees plus value
    /// removed from holders by rebase-time fee charges. Measured against the
    /// rounded-up supply, so paying it out never touches holder claims.
    pub fn accrued_fees(&self) -> Result<u128, LedgerError> {
        let claims = self.total_supply(Leg::X)?.max(self.total_supply(Leg::Y)?);
        Ok(self.custody.saturating_sub(claims))
    }

    pub fn is_tripped(&self, gate: Gate) -> bool {
        self.gates.breakers.is_tripped(gate)
    }

    pub fn deposit_rate_limit(&self) -> Option<RateLimitParams> {
        self.gates.deposit_limit.as_ref().map(DepositRateLimit::params)
    }

    // ── Events ───────────────────────────────────────────────────────────

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&LedgerEvent) + Send + Sync>) {
        self.bus.subscribe(listener);
    }

    /// Take the recorded events, fanning each out to subscribers.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        let events = std::mem::take(&mut self.events);
        for event in &events {
            self.bus.emit(event);
        }
        events
    }

    pub fn pending_events(&self) -> &[LedgerEvent] {
        &self.events
    }

    // ── Owner administration ─────────────────────────────────────────────

    /// Change the fee rate or enablement. Applies from the next fee
    /// calculation; intervals already charged are not revisited.
    pub fn set_fee_parameters(&mut self, caller: &Address, params: FeeParameters) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        if params.rate_per_day_bps >= ProtocolParams::FEE_DENOMINATOR {
            return Err(LedgerError::InvalidFeeRate(params.rate_per_day_bps));
        }
        self.fees = params;
        info!(
            rate_bps = params.rate_per_day_bps,
            enabled = params.enabled,
            "fee parameters updated"
        );
        self.emit(LedgerEvent::FeeParametersUpdated { params });
        Ok(())
    }

    pub fn set_circuit_breaker(&mut self, caller: &Address, gate: Gate, tripped: bool) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        self.gates.breakers.set(gate, tripped);
        info!(%gate, tripped, "circuit breaker toggled");
        self.emit(LedgerEvent::CircuitBreakerToggled { gate, tripped });
        Ok(())
    }

    /// Replace the deposit rate limit; the rolling window starts afresh.
    pub fn set_deposit_rate_limit(
        &mut self,
        caller: &Address,
        limit: Option<RateLimitParams>,
    ) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        if let Some(params) = limit {
            if params.window_secs == 0 {
                return Err(LedgerError::InvalidParams(tranche_types::TypesError::InvalidParams(
                    "deposit rate-limit window must be non-zero".into(),
                )));
            }
        }
        self.gates.deposit_limit = limit.map(DepositRateLimit::new);
        self.params.deposit_rate_limit = limit;
        info!(?limit, "deposit rate limit updated");
        self.emit(LedgerEvent::DepositRateLimitUpdated { limit });
        Ok(())
    }

    pub fn set_sanctions_list(
        &mut self,
        caller: &Address,
        list: Option<Box<dyn SanctionsList>>,
    ) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        let installed = list.is_some();
        self.gates.sanctions = list;
        info!(installed, "sanctions list updated");
        self.emit(LedgerEvent::SanctionsListUpdated { installed });
        Ok(())
    }

    pub fn set_sequencer(&mut self, caller: &Address, sequencer: Address) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        let previous = std::mem::replace(&mut self.roles.sequencer, sequencer.clone());
        info!(%previous, new = %sequencer, "sequencer rotated");
        self.emit(LedgerEvent::SequencerUpdated {
            previous,
            new: sequencer,
        });
        Ok(())
    }

    /// Install the one collaborator allowed to burn through the tranches.
    pub fn set_wrapper(&mut self, caller: &Address, wrapper: Option<Address>) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        self.wrapper = wrapper.clone();
        info!(wrapper = ?wrapper.as_ref().map(Address::as_str), "wrapper updated");
        self.emit(LedgerEvent::WrapperUpdated { wrapper });
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        let previous = std::mem::replace(&mut self.roles.owner, new_owner.clone());
        info!(%previous, new = %new_owner, "ownership transferred");
        self.emit(LedgerEvent::OwnershipTransferred {
            previous,
            new: new_owner,
        });
        Ok(())
    }

    /// Send every accrued fee to `receiver`. Returns the amount sent.
    pub fn collect_fees(&mut self, caller: &Address, receiver: &Address) -> Result<u128, LedgerError> {
        self.require_owner(caller)?;
        let amount = self.accrued_fees()?;
        if amount == 0 {
            return Ok(0);
        }
        self.asset.transfer(&self.roles.ledger, receiver, amount)?;
        self.custody -= amount;
        info!(receiver = %receiver, amount, "fees collected");
        self.emit(LedgerEvent::FeesCollected {
            receiver: receiver.clone(),
            amount,
        });
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{addr, fixture, OWNER, TRANCHE_X};
    use tranche_math::WAD;

    #[test]
    fn fresh_ledger_queries() {
        let ledger = fixture(ProtocolParams::default());
        assert_eq!(ledger.rebase_number(), 0);
        assert_eq!(ledger.next_sequence_number(), 1);
        assert_eq!(ledger.last_time_stamp(), Timestamp::new(1_000));
        assert_eq!(ledger.total_supply(Leg::X).unwrap(), 0);
        assert_eq!(ledger.balance_of(&addr("nobody"), Leg::Y).unwrap(), 0);
        assert!(ledger.scheduled_rebase(1).is_none());
        assert_eq!(ledger.accrued_fees().unwrap(), 0);
    }

    #[test]
    fn invalid_params_rejected() {
        let params = ProtocolParams {
            rebase_interval_secs: 0,
            ..ProtocolParams::default()
        };
        let result = Ledger::new(
            crate::testing::roles(),
            crate::testing::MemoryAsset::default(),
            params,
            Timestamp::EPOCH,
        );
        assert!(matches!(result, Err(LedgerError::InvalidParams(_))));
    }

    #[test]
    fn fee_prorated_to_next_natural_rebase() {
        let ledger = fixture(ProtocolParams::default());
        // Genesis at 1 000, interval one day: half a day left at 44 200.
        let half = ledger
            .calculate_management_fee(WAD, false, 10, Timestamp::new(44_200))
            .unwrap();
        assert_eq!(half, WAD / 2_000);
        // Past the boundary nothing is left to prepay.
        let late = ledger
            .calculate_management_fee(WAD, false, 10, Timestamp::new(90_000))
            .unwrap();
        assert_eq!(late, 0);
        // Default rate is zero while fees are disabled.
        let default = ledger
            .calculate_management_fee(WAD, true, 0, Timestamp::new(1_000))
            .unwrap();
        assert_eq!(default, 0);
    }

    #[test]
    fn override_rate_bounds() {
        let ledger = fixture(ProtocolParams::default());
        assert_eq!(
            ledger.calculate_management_fee(WAD, false, 10_000, Timestamp::new(1_000)),
            Err(LedgerError::InvalidFeeRate(10_000))
        );
    }

    #[test]
    fn admin_requires_owner() {
        let mut ledger = fixture(ProtocolParams::default());
        let intruder = addr("intruder");
        assert_eq!(
            ledger.set_circuit_breaker(&intruder, Gate::Deposit, true),
            Err(LedgerError::Unauthorized(intruder.clone()))
        );
        assert_eq!(
            ledger.set_fee_parameters(&intruder, FeeParameters::default()),
            Err(LedgerError::Unauthorized(intruder.clone()))
        );
        assert_eq!(
            ledger.transfer_ownership(&addr(TRANCHE_X), intruder.clone()),
            Err(LedgerError::Unauthorized(addr(TRANCHE_X)))
        );
        assert!(ledger.pending_events().is_empty());
    }

    #[test]
    fn ownership_transfer_moves_admin_rights() {
        let mut ledger = fixture(ProtocolParams::default());
        let next = addr("next-owner");
        ledger.transfer_ownership(&addr(OWNER), next.clone()).unwrap();
        assert_eq!(ledger.owner(), &next);
        assert!(ledger.set_circuit_breaker(&addr(OWNER), Gate::Rebase, true).is_err());
        ledger.set_circuit_breaker(&next, Gate::Rebase, true).unwrap();
        assert!(ledger.is_tripped(Gate::Rebase));
    }

    #[test]
    fn fee_rate_validated() {
        let mut ledger = fixture(ProtocolParams::default());
        let params = FeeParameters {
            rate_per_day_bps: 10_000,
            enabled: true,
        };
        assert_eq!(
            ledger.set_fee_parameters(&addr(OWNER), params),
            Err(LedgerError::InvalidFeeRate(10_000))
        );
    }

    #[test]
    fn drain_fans_out_to_subscribers() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let mut ledger = fixture(ProtocolParams::default());
        let seen = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&seen);
        ledger.subscribe(Box::new(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        }));
        ledger.set_circuit_breaker(&addr(OWNER), Gate::Deposit, true).unwrap();
        ledger.set_circuit_breaker(&addr(OWNER), Gate::Deposit, false).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        assert_eq!(ledger.drain_events().len(), 2);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert!(ledger.drain_events().is_empty());
    }
}
