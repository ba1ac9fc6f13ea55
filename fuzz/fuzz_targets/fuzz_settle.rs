#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tranche_math::{advance_index, settle, GlobalIndex, UserSnapshot, WAD};
use tranche_types::{Leg, RebaseRecord, Timestamp};

#[derive(Debug, Arbitrary)]
struct Step {
    underlying: u64,
    x_share: u64,
    fee_bps: u16,
}

#[derive(Debug, Arbitrary)]
struct Input {
    net_x: u64,
    net_y: u64,
    steps: Vec<Step>,
}

// Settling a holder across any chain of rebases never panics, never grows
// the paired principal, and is idempotent.
fuzz_target!(|input: Input| {
    let mut index = GlobalIndex::genesis(Timestamp::new(0));
    let mut snapshot = UserSnapshot::empty(index);
    if snapshot.credit(Leg::X, input.net_x as u128).is_err()
        || snapshot.credit(Leg::Y, input.net_y as u128).is_err()
    {
        return;
    }

    for (seq, step) in input.steps.iter().take(32).enumerate() {
        let underlying = (step.underlying as u128).max(1) * WAD;
        let x = underlying * (step.x_share as u128 % 1_001) / 1_000;
        let record = RebaseRecord {
            sequence_number: seq as u64 + 1,
            is_natural: false,
            underlying_value: underlying,
            tranche_x_value: x,
        };
        let fee_factor = WAD - WAD * (step.fee_bps as u128 % 10_000) / 10_000;
        match advance_index(&index, &record, fee_factor, 86_400) {
            Ok(next) => index = next,
            Err(_) => break,
        }
    }

    if let Ok(settled) = settle(&index, &snapshot) {
        assert!(settled.snapshot.net_x <= input.net_x as u128);
        assert!(settled.snapshot.net_y <= input.net_y as u128);
        let again = settle(&index, &settled.snapshot).expect("settled snapshot re-settles");
        assert!(!again.changed);
        assert_eq!((again.balance_x, again.balance_y), (settled.balance_x, settled.balance_y));
    }
});
