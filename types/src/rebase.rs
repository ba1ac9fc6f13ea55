//! The signed rebase record.

use serde::{Deserialize, Serialize};

/// One price update carried by a signed rebase message.
///
/// `underlying_value` is the value of one underlying unit, `tranche_x_value`
/// the value of one X unit, both in the same (arbitrary) quote unit. The Y
/// value is implied: `underlying_value - tranche_x_value`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RebaseRecord {
    pub sequence_number: u64,
    /// Interval-gated rebase (`true`) or early/administrative rebase.
    pub is_natural: bool,
    pub underlying_value: u128,
    pub tranche_x_value: u128,
}

impl RebaseRecord {
    /// The implied Y value, `None` if `tranche_x_value > underlying_value`.
    pub fn tranche_y_value(&self) -> Option<u128> {
        self.underlying_value.checked_sub(self.tranche_x_value)
    }

    /// Both leg values strictly positive, i.e. `0 < x < underlying`.
    pub fn has_valid_split(&self) -> bool {
        self.tranche_x_value > 0 && self.tranche_x_value < self.underlying_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(underlying: u128, x: u128) -> RebaseRecord {
        RebaseRecord {
            sequence_number: 1,
            is_natural: true,
            underlying_value: underlying,
            tranche_x_value: x,
        }
    }

    #[test]
    fn implied_y_value() {
        assert_eq!(record(300, 100).tranche_y_value(), Some(200));
        assert_eq!(record(100, 300).tranche_y_value(), None);
    }

    #[test]
    fn split_validity() {
        assert!(record(300, 100).has_valid_split());
        assert!(!record(300, 0).has_valid_split());
        assert!(!record(300, 300).has_valid_split());
        assert!(!record(300, 400).has_valid_split());
    }
}
