//! Fundamental types for the two-tranche rebasing ledger.
//!
//! This crate defines the vocabulary shared by every other crate in the
//! workspace: account addresses, timestamps and clocks, the two tranche legs,
//! signing key newtypes, the signed rebase record and the protocol parameters.

pub mod address;
pub mod amount;
pub mod error;
pub mod keys;
pub mod leg;
pub mod params;
pub mod rebase;
pub mod time;

pub use address::Address;
pub use error::TypesError;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use leg::Leg;
pub use params::{ProtocolParams, RateLimitParams};
pub use rebase::RebaseRecord;
pub use time::{Clock, SystemClock, Timestamp};
