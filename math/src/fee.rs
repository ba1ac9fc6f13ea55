//! Management-fee proration.
//!
//! Fees are prepaid up to a horizon that moves in whole rebase intervals.
//! A deposit pays for the time remaining until the next natural rebase; a
//! rebase that finds the horizon reached charges every interval due at once
//! through the index.

use serde::{Deserialize, Serialize};
use tranche_types::{ProtocolParams, Timestamp};

use crate::error::MathError;
use crate::fixed::{mul_div_up, mul_mul_div, WAD};

const SECONDS_PER_DAY: u128 = ProtocolParams::SECONDS_PER_DAY as u128;
const FEE_DENOMINATOR: u128 = ProtocolParams::FEE_DENOMINATOR;

/// Process-wide fee configuration. A change applies from the next fee
/// calculation on; past intervals are never recomputed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeParameters {
    pub rate_per_day_bps: u128,
    pub enabled: bool,
}

impl FeeParameters {
    /// The rate fees are charged at, zero while disabled.
    pub fn effective_rate(&self) -> u128 {
        if self.enabled {
            self.rate_per_day_bps
        } else {
            0
        }
    }
}

/// Fee on `amount` for `remaining_secs` at `rate_bps_per_day`.
///
/// Equivalent to `remaining · (rate · interval / day) · amount / interval /
/// 10 000`, evaluated as one product so small daily rates are not truncated
/// to zero at the per-interval step.
pub fn management_fee(
    amount: u128,
    rate_bps_per_day: u128,
    remaining_secs: u64,
) -> Result<u128, MathError> {
    mul_mul_div(
        amount,
        rate_bps_per_day,
        remaining_secs as u128,
        SECONDS_PER_DAY,
        FEE_DENOMINATOR,
    )
}

/// Smallest deposit whose net-of-fee principal is at least `net`.
pub fn gross_for_net(
    net: u128,
    rate_bps_per_day: u128,
    remaining_secs: u64,
) -> Result<u128, MathError> {
    let whole = SECONDS_PER_DAY * FEE_DENOMINATOR;
    let charged = rate_bps_per_day
        .checked_mul(remaining_secs as u128)
        .ok_or(MathError::Overflow)?;
    if charged >= whole {
        return Err(MathError::FeeTooLarge);
    }
    mul_div_up(net, whole, whole - charged)
}

/// Index multiplier (WAD) that charges `intervals` whole intervals of fee.
pub fn interval_fee_factor(
    rate_bps_per_day: u128,
    interval_secs: u64,
    intervals: u64,
) -> Result<u128, MathError> {
    let secs = (interval_secs as u128)
        .checked_mul(intervals as u128)
        .ok_or(MathError::Overflow)?;
    let charge = mul_mul_div(WAD, rate_bps_per_day, secs, SECONDS_PER_DAY, FEE_DENOMINATOR)?;
    if charge >= WAD {
        return Err(MathError::FeeTooLarge);
    }
    Ok(WAD - charge)
}

/// Whole intervals of fee due at `now` for a ledger prepaid up to `horizon`:
/// zero before the horizon, otherwise every elapsed interval plus the one
/// starting now.
pub fn intervals_due(horizon: Timestamp, now: Timestamp, interval_secs: u64) -> u64 {
    if now < horizon || interval_secs == 0 {
        return 0;
    }
    horizon.elapsed_since(now) / interval_secs + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400;

    #[test]
    fn full_day_fee() {
        // 10 bps/day on 1e18 for one day = 0.1 %.
        assert_eq!(management_fee(WAD, 10, DAY).unwrap(), WAD / 1_000);
    }

    #[test]
    fn fee_prorates_with_remaining_time() {
        let full = management_fee(WAD, 10, DAY).unwrap();
        let half = management_fee(WAD, 10, DAY / 2).unwrap();
        assert_eq!(half * 2, full);
        assert_eq!(management_fee(WAD, 10, 0).unwrap(), 0);
    }

    #[test]
    fn small_rates_survive_short_intervals() {
        // 1 bps/day over one hour would truncate to 0 bps/interval.
        assert!(management_fee(WAD, 1, 3_600).unwrap() > 0);
    }

    #[test]
    fn gross_for_net_inverts_the_fee() {
        let gross = gross_for_net(WAD, 10, DAY).unwrap();
        let fee = management_fee(gross, 10, DAY).unwrap();
        assert!(gross - fee >= WAD);
        assert!(gross - fee - WAD <= 1);
    }

    #[test]
    fn fee_factor_for_multiple_intervals() {
        let one = interval_fee_factor(10, DAY, 1).unwrap();
        let three = interval_fee_factor(10, DAY, 3).unwrap();
        assert_eq!(WAD - one, WAD / 1_000);
        assert_eq!(WAD - three, 3 * (WAD / 1_000));
        assert_eq!(interval_fee_factor(0, DAY, 5).unwrap(), WAD);
    }

    #[test]
    fn confiscatory_fee_rejected() {
        assert_eq!(
            interval_fee_factor(5_000, DAY, 2),
            Err(MathError::FeeTooLarge)
        );
        assert_eq!(gross_for_net(1, 10_000, DAY), Err(MathError::FeeTooLarge));
    }

    #[test]
    fn intervals_due_counts_missed_intervals() {
        let horizon = Timestamp::new(1_000);
        assert_eq!(intervals_due(horizon, Timestamp::new(999), 100), 0);
        assert_eq!(intervals_due(horizon, Timestamp::new(1_000), 100), 1);
        assert_eq!(intervals_due(horizon, Timestamp::new(1_099), 100), 1);
        assert_eq!(intervals_due(horizon, Timestamp::new(1_350), 100), 4);
    }

    #[test]
    fn disabled_fees_have_zero_rate() {
        let params = FeeParameters {
            rate_per_day_bps: 25,
            enabled: false,
        };
        assert_eq!(params.effective_rate(), 0);
    }
}
