use proptest::prelude::*;

use tranche_types::{Leg, RebaseRecord, Signature, Timestamp};

proptest! {
    /// Signature bytes survive the opaque-bytes constructor unchanged.
    #[test]
    fn signature_from_slice_preserves_bytes(bytes in prop::collection::vec(any::<u8>(), 64)) {
        let sig = Signature::from_slice(&bytes).unwrap();
        prop_assert_eq!(&sig.as_bytes()[..], &bytes[..]);
    }

    /// Any other length is rejected.
    #[test]
    fn signature_wrong_length_rejected(len in 0usize..200) {
        prop_assume!(len != 64);
        prop_assert!(Signature::from_slice(&vec![0u8; len]).is_err());
    }

    /// The implied Y value plus the X value always equals the underlying value.
    #[test]
    fn implied_y_completes_the_split(underlying in 1u128..u128::MAX / 2, x_frac in 0u64..=1000) {
        let x = underlying / 1000 * x_frac as u128;
        let record = RebaseRecord {
            sequence_number: 1,
            is_natural: false,
            underlying_value: underlying,
            tranche_x_value: x,
        };
        let y = record.tranche_y_value().unwrap();
        prop_assert_eq!(x + y, underlying);
    }

    /// `has_expired` agrees with `elapsed_since`.
    #[test]
    fn expiry_matches_elapsed(start in 0u64..1_000_000, duration in 0u64..1_000_000, now in 0u64..3_000_000) {
        let t = Timestamp::new(start);
        let now = Timestamp::new(now);
        prop_assert_eq!(t.has_expired(duration, now), now.as_secs() >= start + duration);
    }

    /// `other` is an involution.
    #[test]
    fn other_leg_involution(is_x in any::<bool>()) {
        let leg = if is_x { Leg::X } else { Leg::Y };
        prop_assert_eq!(leg.other().other(), leg);
        prop_assert_ne!(leg.other(), leg);
    }
}
