//! Cryptographic primitives for rebase-message authentication.
//!
//! - **Blake2b-256** digests of the ABI-encoded rebase payload
//! - **Ed25519** signing (price signer side) and verification (sequencer side)
//! - [`RebaseVerifier`], the pluggable capability the sequencer consults

pub mod hash;
pub mod keys;
pub mod sign;
pub mod verifier;

pub use hash::{blake2b_256, blake2b_256_multi, rebase_digest};
pub use keys::{generate_keypair, keypair_from_private, keypair_from_seed, public_from_private};
pub use sign::{sign_digest, sign_message, verify_signature};
pub use verifier::{Ed25519Verifier, RebaseVerifier};
