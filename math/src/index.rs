//! Global rebase index and per-holder snapshots.

use serde::{Deserialize, Serialize};
use tranche_types::{Leg, Timestamp};

use crate::error::MathError;
use crate::fixed::WAD;

/// The single piece of global state a rebase mutates.
///
/// Held once by the ledger; holders keep a copy of the value they last
/// settled against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalIndex {
    /// Cumulative multiplier on every holder's net X and net Y principal (WAD).
    /// Strictly positive; each rebase multiplies it by `2·min(x, y)/u ≤ 1`
    /// and by the management-fee factor.
    pub balance_factor_xy: u128,
    /// Drift pool fed when the X leg gains (stored fee-index-adjusted).
    pub balance_factor_ux: u128,
    /// Drift pool fed when the Y leg gains (stored fee-index-adjusted).
    pub balance_factor_uy: u128,
    /// Cumulative product of management-fee factors (WAD).
    pub fee_index: u128,
    /// Last fully-applied rebase sequence number.
    pub sequence_number: u64,
    /// Schedule anchor of the last natural rebase.
    pub last_natural_rebase: Timestamp,
    /// Renormalization epoch; factors are only comparable within one.
    #[serde(default)]
    pub epoch: u64,
}

impl GlobalIndex {
    /// Index at ledger creation; the natural-rebase schedule starts at `start`.
    pub fn genesis(start: Timestamp) -> Self {
        Self {
            balance_factor_xy: WAD,
            balance_factor_ux: 0,
            balance_factor_uy: 0,
            fee_index: WAD,
            sequence_number: 0,
            last_natural_rebase: start,
            epoch: 0,
        }
    }

    pub fn next_sequence_number(&self) -> u64 {
        self.sequence_number.saturating_add(1)
    }

    /// Earliest time the next natural rebase may be applied.
    pub fn next_natural_rebase(&self, interval_secs: u64) -> Timestamp {
        self.last_natural_rebase.plus(interval_secs)
    }
}

/// A holder's principal and drift-pool shares as of `last_index`.
///
/// One snapshot covers both legs because a single rebase moves both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub net_x: u128,
    pub net_y: u128,
    pub ux: u128,
    pub uy: u128,
    pub last_index: GlobalIndex,
}

impl UserSnapshot {
    /// Zero-balance snapshot anchored at `index`.
    pub fn empty(index: GlobalIndex) -> Self {
        Self {
            net_x: 0,
            net_y: 0,
            ux: 0,
            uy: 0,
            last_index: index,
        }
    }

    /// Balance of `leg` as recorded, without settling.
    pub fn recorded_balance(&self, leg: Leg) -> Result<u128, MathError> {
        let net = match leg {
            Leg::X => self.net_x,
            Leg::Y => self.net_y,
        };
        net.checked_add(self.ux)
            .and_then(|v| v.checked_add(self.uy))
            .ok_or(MathError::Overflow)
    }

    pub fn is_zero(&self) -> bool {
        self.net_x == 0 && self.net_y == 0 && self.ux == 0 && self.uy == 0
    }

    /// Add `amount` of principal to `leg`. Only valid on a consolidated
    /// snapshot anchored at the current index.
    pub fn credit(&mut self, leg: Leg, amount: u128) -> Result<(), MathError> {
        let net = match leg {
            Leg::X => &mut self.net_x,
            Leg::Y => &mut self.net_y,
        };
        *net = net.checked_add(amount).ok_or(MathError::Overflow)?;
        Ok(())
    }

    /// Remove `amount` of principal from `leg`; `None` if it exceeds the
    /// principal. Only valid on a consolidated snapshot.
    pub fn debit(&mut self, leg: Leg, amount: u128) -> Option<()> {
        let net = match leg {
            Leg::X => &mut self.net_x,
            Leg::Y => &mut self.net_y,
        };
        *net = net.checked_sub(amount)?;
        Some(())
    }
}
