//! Nullable infrastructure for deterministic testing.
//!
//! Everything the core consults from outside (block time, the underlying
//! asset, the rebase signer, post-rebase call targets, the sanctions list)
//! sits behind a trait. This crate provides test-friendly implementations
//! that:
//! - Return deterministic values
//! - Can be controlled programmatically, including after being handed to
//!   the ledger or sequencer (handles are cheap clones over shared state)
//! - Never touch the filesystem or network

pub mod asset;
pub mod clock;
pub mod executor;
pub mod sanctions;
pub mod verifier;

pub use asset::NullAsset;
pub use clock::NullClock;
pub use executor::{ExecutedCall, NullExecutor};
pub use sanctions::NullSanctions;
pub use verifier::NullVerifier;

use std::sync::{Mutex, MutexGuard};

/// Lock, ignoring poisoning: a panicking test already failed.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
