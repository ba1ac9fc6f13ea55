//! Pluggable verification of signed rebase payloads.

use tranche_types::{PublicKey, Signature};

use crate::hash::rebase_digest;
use crate::sign::verify_signature;

/// Capability to decide whether `signature` was produced by the registered
/// rebase signer over exactly `encoded_payload`.
///
/// The sequencer depends only on this trait, so tests can swap in a mock
/// signer and hosts can plug in another signature scheme.
pub trait RebaseVerifier {
    fn verify(&self, encoded_payload: &[u8], signature: &Signature) -> bool;
}

/// Ed25519 over the Blake2b rebase digest.
#[derive(Clone, Debug)]
pub struct Ed25519Verifier {
    signer: PublicKey,
}

impl Ed25519Verifier {
    pub fn new(signer: PublicKey) -> Self {
        Self { signer }
    }

    pub fn signer(&self) -> &PublicKey {
        &self.signer
    }
}

impl RebaseVerifier for Ed25519Verifier {
    fn verify(&self, encoded_payload: &[u8], signature: &Signature) -> bool {
        verify_signature(&rebase_digest(encoded_payload), signature, &self.signer)
    }
}

impl<V: RebaseVerifier + ?Sized> RebaseVerifier for Box<V> {
    fn verify(&self, encoded_payload: &[u8], signature: &Signature) -> bool {
        (**self).verify(encoded_payload, signature)
    }
}
