//! Lazy settlement of one holder against the global index.

use tranche_types::Leg;

use crate::error::MathError;
use crate::fixed::{mul_div_rounded, mul_mul_div_rounded, Rounding, WAD};
use crate::index::{GlobalIndex, UserSnapshot};

/// Result of settling a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub balance_x: u128,
    pub balance_y: u128,
    /// The snapshot re-anchored at the global index. Callers persist it.
    pub snapshot: UserSnapshot,
    /// Whether the index had moved since the snapshot was taken. Callers
    /// emit a settlement notification when this is set.
    pub changed: bool,
}

impl Settlement {
    pub fn balance(&self, leg: Leg) -> u128 {
        match leg {
            Leg::X => self.balance_x,
            Leg::Y => self.balance_y,
        }
    }

    /// Fold the drift-pool shares into principal: `netX = balanceX`,
    /// `netY = balanceY`, `ux = uy = 0`.
    ///
    /// Pairs held in the pools behave exactly like equal amounts of X and Y
    /// principal under every later rebase, so folding changes no future
    /// balance. Debits and credits are applied to the folded form.
    pub fn consolidated(&self) -> UserSnapshot {
        UserSnapshot {
            net_x: self.balance_x,
            net_y: self.balance_y,
            ux: 0,
            uy: 0,
            last_index: self.snapshot.last_index,
        }
    }
}

/// Settle `snapshot` against `global`.
///
/// Pure: the caller owns persistence. When `global` equals the snapshot's
/// `last_index` this is the fast path and returns the recorded balances
/// untouched. Every division rounds down, against the holder.
pub fn settle(global: &GlobalIndex, snapshot: &UserSnapshot) -> Result<Settlement, MathError> {
    settle_rounded(global, snapshot, Rounding::Down)
}

/// Settle the supply aggregate against `global`.
///
/// Rounds up, so the aggregate stays an upper bound on the sum of the
/// holders it covers however often each of them has been settled.
pub fn settle_aggregate(global: &GlobalIndex, snapshot: &UserSnapshot) -> Result<Settlement, MathError> {
    settle_rounded(global, snapshot, Rounding::Up)
}

fn settle_rounded(
    global: &GlobalIndex,
    snapshot: &UserSnapshot,
    rounding: Rounding,
) -> Result<Settlement, MathError> {
    let last = &snapshot.last_index;
    if global == last {
        return Ok(Settlement {
            balance_x: snapshot.recorded_balance(Leg::X)?,
            balance_y: snapshot.recorded_balance(Leg::Y)?,
            snapshot: *snapshot,
            changed: false,
        });
    }
    if global.epoch != last.epoch {
        return Err(MathError::EpochMismatch {
            snapshot: last.epoch,
            index: global.epoch,
        });
    }
    if global.sequence_number < last.sequence_number {
        return Err(MathError::NonMonotonicIndex);
    }

    let net_x = mul_div_rounded(snapshot.net_x, global.balance_factor_xy, last.balance_factor_xy, rounding)?;
    let net_y = mul_div_rounded(snapshot.net_y, global.balance_factor_xy, last.balance_factor_xy, rounding)?;

    let ux = settle_pool(
        snapshot.ux,
        snapshot.net_x,
        global.balance_factor_ux,
        last.balance_factor_ux,
        global,
        last,
        rounding,
    )?;
    let uy = settle_pool(
        snapshot.uy,
        snapshot.net_y,
        global.balance_factor_uy,
        last.balance_factor_uy,
        global,
        last,
        rounding,
    )?;

    let settled = UserSnapshot {
        net_x,
        net_y,
        ux,
        uy,
        last_index: *global,
    };
    Ok(Settlement {
        balance_x: settled.recorded_balance(Leg::X)?,
        balance_y: settled.recorded_balance(Leg::Y)?,
        snapshot: settled,
        changed: true,
    })
}

/// `pool · Φ/Φ₀ + (U − U₀) · net · Φ / (F₀ · WAD)`
fn settle_pool(
    pool: u128,
    net: u128,
    factor_now: u128,
    factor_then: u128,
    global: &GlobalIndex,
    last: &GlobalIndex,
    rounding: Rounding,
) -> Result<u128, MathError> {
    let delta = factor_now
        .checked_sub(factor_then)
        .ok_or(MathError::NonMonotonicIndex)?;
    let carried = mul_div_rounded(pool, global.fee_index, last.fee_index, rounding)?;
    let accrued = mul_mul_div_rounded(delta, net, global.fee_index, last.balance_factor_xy, WAD, rounding)?;
    carried.checked_add(accrued).ok_or(MathError::Overflow)
}
