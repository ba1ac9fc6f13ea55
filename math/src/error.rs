//! Rebase-math errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("arithmetic overflow in rebase computation")]
    Overflow,

    #[error("division by zero in rebase computation")]
    DivisionByZero,

    #[error("invalid rebase values: tranche X value {tranche_x} must lie strictly between 0 and underlying value {underlying}")]
    InvalidRebaseValues { underlying: u128, tranche_x: u128 },

    #[error("rebase would collapse the balance factor to zero")]
    IndexCollapsed,

    #[error("fee factor {0} is outside (0, 1e18]")]
    InvalidFeeFactor(u128),

    #[error("management fee would consume the entire principal")]
    FeeTooLarge,

    #[error("global index moved backwards relative to a holder snapshot")]
    NonMonotonicIndex,

    #[error("snapshot from epoch {snapshot} cannot be settled against an index in epoch {index}")]
    EpochMismatch { snapshot: u64, index: u64 },

    #[error("no archived index for epoch {0}")]
    UnknownEpoch(u64),
}
