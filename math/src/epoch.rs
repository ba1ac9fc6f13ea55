//! Index renormalization.
//!
//! Every uneven rebase shrinks `balance_factor_xy` and every fee charge
//! shrinks `fee_index`. Both are WAD integers, so left alone they would
//! lose precision and finally reach zero. Once either drops below
//! [`RENORMALIZE_BELOW`] the epoch is closed: its last index is archived and
//! a fresh index starts at `WAD` with empty drift pools. A snapshot from a
//! closed epoch settles against that epoch's archived index, is folded into
//! principal, and carries on from the next epoch's start.

use crate::error::MathError;
use crate::fixed::WAD;
use crate::index::{GlobalIndex, UserSnapshot};
use crate::settle::{settle, Settlement};

/// Floor for `balance_factor_xy` and `fee_index`. Above it one unit of
/// truncation costs a holder at most one part in 10¹⁵ per rebase.
pub const RENORMALIZE_BELOW: u128 = WAD / 1_000;

impl GlobalIndex {
    /// Whether this index should close its epoch.
    pub fn needs_renormalization(&self) -> bool {
        self.balance_factor_xy < RENORMALIZE_BELOW || self.fee_index < RENORMALIZE_BELOW
    }

    /// First index of the epoch after this one. Sequence and schedule carry
    /// over; the factors restart.
    pub fn next_epoch(&self) -> Result<Self, MathError> {
        Ok(Self {
            balance_factor_xy: WAD,
            balance_factor_ux: 0,
            balance_factor_uy: 0,
            fee_index: WAD,
            epoch: self.epoch.checked_add(1).ok_or(MathError::Overflow)?,
            ..*self
        })
    }
}

/// Settle `snapshot` against `global`, walking it through every epoch
/// closed since it was taken. `closed[e]` is the last index of epoch `e`.
pub fn settle_across(
    global: &GlobalIndex,
    closed: &[GlobalIndex],
    snapshot: &UserSnapshot,
) -> Result<Settlement, MathError> {
    if snapshot.last_index.epoch > global.epoch {
        return Err(MathError::EpochMismatch {
            snapshot: snapshot.last_index.epoch,
            index: global.epoch,
        });
    }
    let mut current = *snapshot;
    let mut migrated = false;
    while current.last_index.epoch < global.epoch {
        let epoch = current.last_index.epoch;
        let end = usize::try_from(epoch)
            .ok()
            .and_then(|e| closed.get(e))
            .ok_or(MathError::UnknownEpoch(epoch))?;
        let mut folded = settle(end, &current)?.consolidated();
        folded.last_index = end.next_epoch()?;
        current = folded;
        migrated = true;
    }
    let mut settlement = settle(global, &current)?;
    settlement.changed |= migrated;
    Ok(settlement)
}
