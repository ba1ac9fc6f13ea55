//! Advancing the global index by one rebase record.

use tranche_types::RebaseRecord;

use crate::error::MathError;
use crate::fixed::{mul_div, mul_mul_div, WAD};
use crate::index::GlobalIndex;

/// Compute the index after applying `record`, charging `fee_factor` (WAD,
/// `1e18` = no fee) first.
///
/// With `u` the underlying value, `x` the X value and `y = u − x`:
///
/// - the fee multiplies `balance_factor_xy` and `fee_index`;
/// - `balance_factor_xy *= 2·min(x, y)/u` shrinks the excess principal
///   of whichever leg lost value;
/// - the gaining leg's drift pool grows by `F·|y − x|/u`, stored divided
///   by the fee index so later fees reach pool-held pairs too.
///
/// Value is conserved per holder: an X unit is worth `x` before and `u/2`
/// after, a Y unit `y` before and `u/2` after.
///
/// Ordering, time gating and the fee horizon are the caller's concern; this
/// only advances `sequence_number` by one and, for natural rebases, moves the
/// schedule anchor forward by `interval_secs`.
pub fn advance_index(
    index: &GlobalIndex,
    record: &RebaseRecord,
    fee_factor: u128,
    interval_secs: u64,
) -> Result<GlobalIndex, MathError> {
    if !record.has_valid_split() {
        return Err(MathError::InvalidRebaseValues {
            underlying: record.underlying_value,
            tranche_x: record.tranche_x_value,
        });
    }
    if fee_factor == 0 || fee_factor > WAD {
        return Err(MathError::InvalidFeeFactor(fee_factor));
    }

    let underlying = record.underlying_value;
    let x = record.tranche_x_value;
    let y = underlying - x;

    let charged = mul_div(index.balance_factor_xy, fee_factor, WAD)?;
    let fee_index = mul_div(index.fee_index, fee_factor, WAD)?;
    if charged == 0 || fee_index == 0 {
        return Err(MathError::IndexCollapsed);
    }

    // min(x, y) <= u/2, so the doubling cannot overflow.
    let balance_factor_xy = mul_div(charged, 2 * x.min(y), underlying)?;
    if balance_factor_xy == 0 {
        return Err(MathError::IndexCollapsed);
    }

    let drift = mul_mul_div(charged, x.abs_diff(y), WAD, underlying, fee_index)?;
    let mut next = GlobalIndex {
        balance_factor_xy,
        fee_index,
        sequence_number: index
            .sequence_number
            .checked_add(1)
            .ok_or(MathError::Overflow)?,
        ..*index
    };
    if y > x {
        next.balance_factor_uy = index
            .balance_factor_uy
            .checked_add(drift)
            .ok_or(MathError::Overflow)?;
    } else if x > y {
        next.balance_factor_ux = index
            .balance_factor_ux
            .checked_add(drift)
            .ok_or(MathError::Overflow)?;
    }
    if record.is_natural {
        next.last_natural_rebase = index.last_natural_rebase.plus(interval_secs);
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tranche_types::Timestamp;

    fn record(is_natural: bool, underlying: u128, x: u128) -> RebaseRecord {
        RebaseRecord {
            sequence_number: 1,
            is_natural,
            underlying_value: underlying,
            tranche_x_value: x,
        }
    }

    #[test]
    fn even_split_only_advances_sequence() {
        let genesis = GlobalIndex::genesis(Timestamp::new(100));
        let next = advance_index(&genesis, &record(false, 2 * WAD, WAD), WAD, 60).unwrap();
        assert_eq!(next.balance_factor_xy, WAD);
        assert_eq!(next.balance_factor_ux, 0);
        assert_eq!(next.balance_factor_uy, 0);
        assert_eq!(next.sequence_number, 1);
        assert_eq!(next.last_natural_rebase, Timestamp::new(100));
    }

    #[test]
    fn y_gain_feeds_uy() {
        let genesis = GlobalIndex::genesis(Timestamp::EPOCH);
        let next = advance_index(&genesis, &record(true, 4 * WAD, WAD), WAD, 60).unwrap();
        assert_eq!(next.balance_factor_xy, WAD / 2);
        assert_eq!(next.balance_factor_uy, WAD / 2);
        assert_eq!(next.balance_factor_ux, 0);
        assert_eq!(next.last_natural_rebase, Timestamp::new(60));
    }

    #[test]
    fn x_gain_feeds_ux() {
        let genesis = GlobalIndex::genesis(Timestamp::EPOCH);
        let next = advance_index(&genesis, &record(true, 4 * WAD, 3 * WAD), WAD, 60).unwrap();
        assert_eq!(next.balance_factor_xy, WAD / 2);
        assert_eq!(next.balance_factor_ux, WAD / 2);
        assert_eq!(next.balance_factor_uy, 0);
    }

    #[test]
    fn fee_scales_factor_and_fee_index() {
        let genesis = GlobalIndex::genesis(Timestamp::EPOCH);
        let fee = WAD / 100 * 99; // 1 % fee
        let next = advance_index(&genesis, &record(false, 2 * WAD, WAD), fee, 60).unwrap();
        assert_eq!(next.balance_factor_xy, fee);
        assert_eq!(next.fee_index, fee);
    }

    #[test]
    fn degenerate_splits_rejected() {
        let genesis = GlobalIndex::genesis(Timestamp::EPOCH);
        for x in [0, 2 * WAD, 3 * WAD] {
            assert!(matches!(
                advance_index(&genesis, &record(true, 2 * WAD, x), WAD, 60),
                Err(MathError::InvalidRebaseValues { .. })
            ));
        }
    }

    #[test]
    fn fee_factor_bounds() {
        let genesis = GlobalIndex::genesis(Timestamp::EPOCH);
        let r = record(true, 2 * WAD, WAD);
        assert_eq!(
            advance_index(&genesis, &r, 0, 60),
            Err(MathError::InvalidFeeFactor(0))
        );
        assert_eq!(
            advance_index(&genesis, &r, WAD + 1, 60),
            Err(MathError::InvalidFeeFactor(WAD + 1))
        );
    }

    #[test]
    fn extreme_split_collapses_index() {
        let genesis = GlobalIndex {
            balance_factor_xy: 1,
            ..GlobalIndex::genesis(Timestamp::EPOCH)
        };
        assert_eq!(
            advance_index(&genesis, &record(true, 10 * WAD, 1), WAD, 60),
            Err(MathError::IndexCollapsed)
        );
    }
}
