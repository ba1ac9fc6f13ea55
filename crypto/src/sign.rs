//! Ed25519 signing and verification of rebase digests.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use tranche_types::{PrivateKey, PublicKey, Signature};

use crate::hash::rebase_digest;

/// Sign arbitrary bytes.
pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    Signature(signing_key.sign(message).to_bytes())
}

/// Sign an encoded rebase payload the way the price signer does: the
/// signature covers [`rebase_digest`] of the payload, not the raw bytes.
pub fn sign_digest(encoded_payload: &[u8], private_key: &PrivateKey) -> Signature {
    sign_message(&rebase_digest(encoded_payload), private_key)
}

/// Verify a signature against a message and public key.
///
/// Uses strict verification, so non-canonical (malleable) signatures fail.
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let dalek_sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify_strict(message, &dalek_sig).is_ok()
}
