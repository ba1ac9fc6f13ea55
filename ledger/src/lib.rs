//! The two-tranche ledger ("token factory").
//!
//! Owns the underlying custody, the [`GlobalIndex`](tranche_math::GlobalIndex),
//! every holder's [`UserSnapshot`](tranche_math::UserSnapshot), the queue of
//! out-of-order rebases, fee parameters and the gates. A rebase only moves
//! the index; holders are settled lazily the next time they are touched.
//!
//! Mutating primitives are reachable only through the two tranche facades
//! (for holder operations) and the sequencer (for rebases). Callers identify
//! themselves with their [`Address`](tranche_types::Address); anything else
//! is rejected.

pub mod accounts;
pub mod asset;
pub mod error;
pub mod events;
pub mod gates;
pub mod guard;
pub mod ledger;
pub mod queue;
pub mod rebase;
pub mod txn;

pub use asset::{AssetError, UnderlyingAsset};
pub use error::LedgerError;
pub use events::{EventBus, LedgerEvent};
pub use gates::{CircuitBreakers, DepositRateLimit, Gate, Gates, SanctionsList};
pub use guard::ReentrancyGuard;
pub use ledger::{Ledger, LedgerRoles};
pub use queue::{RebaseQueue, ScheduledRebase};
pub use rebase::RebaseDisposition;
pub use txn::LedgerCheckpoint;

#[cfg(test)]
pub(crate) mod testing;
