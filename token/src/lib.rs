//! Tranche facades.
//!
//! One [`Tranche`] per leg presents the ledger's paired position as an
//! ERC-20/ERC-4626-style share token. The facade owns no balances: every
//! call is forwarded to the ledger under the tranche's own address, which
//! is the only identity the ledger accepts for holder primitives.

pub mod error;
pub mod tranche;

pub use error::TrancheError;
pub use tranche::{Tranche, TrancheMetadata};
