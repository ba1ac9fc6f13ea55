use proptest::prelude::*;

use tranche_math::{
    advance_index, interval_fee_factor, management_fee, settle, settle_aggregate, GlobalIndex,
    UserSnapshot, WAD,
};
use tranche_types::{RebaseRecord, Timestamp};

const DAY: u64 = 86_400;

fn record(seq: u64, underlying: u128, x: u128) -> RebaseRecord {
    RebaseRecord {
        sequence_number: seq,
        is_natural: false,
        underlying_value: underlying,
        tranche_x_value: x,
    }
}

/// Splits between 10 % and 90 % keep the index well away from collapse.
fn split() -> impl Strategy<Value = (u128, u128)> {
    (10u128..1_000_000, 10u128..=90).prop_map(|(scale, pct)| {
        let underlying = scale * 1_000_000_000_000;
        (underlying, underlying * pct / 100)
    })
}

fn holder(net_x: u128, net_y: u128, index: GlobalIndex) -> UserSnapshot {
    UserSnapshot {
        net_x,
        net_y,
        ux: 0,
        uy: 0,
        last_index: index,
    }
}

proptest! {
    /// Settling twice against the same index changes nothing.
    #[test]
    fn settle_is_idempotent(
        (u, x) in split(),
        net_x in 0u128..1_000_000_000_000_000_000_000_000,
        net_y in 0u128..1_000_000_000_000_000_000_000_000,
    ) {
        let genesis = GlobalIndex::genesis(Timestamp::EPOCH);
        let next = advance_index(&genesis, &record(1, u, x), WAD, DAY).unwrap();
        let first = settle(&next, &holder(net_x, net_y, genesis)).unwrap();
        let second = settle(&next, &first.snapshot).unwrap();
        prop_assert!(!second.changed);
        prop_assert_eq!(first.balance_x, second.balance_x);
        prop_assert_eq!(first.balance_y, second.balance_y);
    }

    /// A holder of matched pairs always has equal X and Y balances, so the
    /// aggregate supply of the two legs never diverges.
    #[test]
    fn pairs_keep_legs_equal(
        rebases in prop::collection::vec(split(), 1..6),
        pairs in 1u128..1_000_000_000_000_000_000_000_000,
    ) {
        let mut index = GlobalIndex::genesis(Timestamp::EPOCH);
        for (i, (u, x)) in rebases.iter().enumerate() {
            index = advance_index(&index, &record(i as u64 + 1, *u, *x), WAD, DAY).unwrap();
        }
        let genesis = GlobalIndex::genesis(Timestamp::EPOCH);
        let s = settle(&index, &holder(pairs, pairs, genesis)).unwrap();
        prop_assert_eq!(s.balance_x, s.balance_y);
    }

    /// A fee-free rebase leaves a pair's value untouched up to rounding dust,
    /// and rounding never favours the holder.
    #[test]
    fn pair_value_preserved_by_rebase(
        (u, x) in split(),
        pairs in 1u128..1_000_000_000_000_000_000_000_000,
    ) {
        let genesis = GlobalIndex::genesis(Timestamp::EPOCH);
        let next = advance_index(&genesis, &record(1, u, x), WAD, DAY).unwrap();
        let s = settle(&next, &holder(pairs, pairs, genesis)).unwrap();
        prop_assert!(s.balance_x <= pairs);
        prop_assert!(pairs - s.balance_x <= 2 * (pairs / WAD) + 4);
    }

    /// However the holders are settled, lazily or touched part-way, they
    /// never add up to more than the aggregate settled upwards at every
    /// rebase.
    #[test]
    fn holders_never_exceed_aggregate(
        rebases in prop::collection::vec(split(), 1..8),
        a in (0u128..1_000_000_000_000_000_000_000, 0u128..1_000_000_000_000_000_000_000),
        b in (0u128..1_000_000_000_000_000_000_000, 0u128..1_000_000_000_000_000_000_000),
        touch in 0usize..8,
    ) {
        let genesis = GlobalIndex::genesis(Timestamp::EPOCH);
        let mut index = genesis;
        let mut aggregate = holder(a.0 + b.0, a.1 + b.1, genesis);
        let mut touched = holder(a.0, a.1, genesis);
        for (i, (u, x)) in rebases.iter().enumerate() {
            index = advance_index(&index, &record(i as u64 + 1, *u, *x), WAD, DAY).unwrap();
            aggregate = settle_aggregate(&index, &aggregate).unwrap().consolidated();
            if i == touch {
                touched = settle(&index, &touched).unwrap().consolidated();
            }
        }
        let sa = settle(&index, &touched).unwrap();
        let sb = settle(&index, &holder(b.0, b.1, genesis)).unwrap();
        let total = settle_aggregate(&index, &aggregate).unwrap();
        prop_assert!(sa.balance_x + sb.balance_x <= total.balance_x);
        prop_assert!(sa.balance_y + sb.balance_y <= total.balance_y);
    }

    /// Touching a holder between rebases (settle, fold, settle again) lands
    /// on the same balances as settling lazily once, up to dust.
    #[test]
    fn settlement_is_path_independent(
        first in split(),
        second in split(),
        net_x in 1u128..1_000_000_000_000_000_000_000,
        net_y in 1u128..1_000_000_000_000_000_000_000,
    ) {
        let genesis = GlobalIndex::genesis(Timestamp::EPOCH);
        let r1 = advance_index(&genesis, &record(1, first.0, first.1), WAD, DAY).unwrap();
        let r2 = advance_index(&r1, &record(2, second.0, second.1), WAD, DAY).unwrap();

        let start = holder(net_x, net_y, genesis);
        let lazy = settle(&r2, &start).unwrap();
        let mid = settle(&r1, &start).unwrap();
        let stepped = settle(&r2, &mid.consolidated()).unwrap();

        let tolerance = net_x.max(net_y) / 1_000_000_000_000_000 + 1_000;
        prop_assert!(lazy.balance_x.abs_diff(stepped.balance_x) <= tolerance);
        prop_assert!(lazy.balance_y.abs_diff(stepped.balance_y) <= tolerance);
    }

    /// The prepaid fee shrinks as the next natural rebase approaches.
    #[test]
    fn deposit_fee_non_increasing_over_time(
        amount in 0u128..1_000_000_000_000_000_000_000_000,
        rate in 0u128..10_000,
        elapsed_a in 0u64..DAY,
        elapsed_b in 0u64..DAY,
    ) {
        let (early, late) = (elapsed_a.min(elapsed_b), elapsed_a.max(elapsed_b));
        let fee_early = management_fee(amount, rate, DAY - early).unwrap();
        let fee_late = management_fee(amount, rate, DAY - late).unwrap();
        prop_assert!(fee_late <= fee_early);
        prop_assert!(fee_early <= amount);
    }

    /// Charging k intervals at once equals charging them one by one, to the
    /// nearest wei of the factor.
    #[test]
    fn fee_factor_is_additive(rate in 0u128..1_000, intervals in 1u64..5) {
        let once = interval_fee_factor(rate, DAY, intervals).unwrap();
        let single = interval_fee_factor(rate, DAY, 1).unwrap();
        let charge = (WAD - single) * intervals as u128;
        prop_assert!((WAD - once).abs_diff(charge) <= intervals as u128);
    }
}
