//! The two tranche legs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the paired claim tokens minted against a deposit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Leg {
    /// Risk-on leg.
    X,
    /// Risk-off (hedge) leg.
    Y,
}

impl Leg {
    pub const BOTH: [Leg; 2] = [Leg::X, Leg::Y];

    /// The paired leg.
    pub fn other(self) -> Self {
        match self {
            Leg::X => Leg::Y,
            Leg::Y => Leg::X,
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leg::X => write!(f, "X"),
            Leg::Y => write!(f, "Y"),
        }
    }
}
