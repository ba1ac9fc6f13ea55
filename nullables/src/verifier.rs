//! Nullable rebase verifier.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tranche_crypto::RebaseVerifier;
use tranche_types::Signature;

/// Accepts or rejects every signature, switchable at runtime.
#[derive(Clone, Debug)]
pub struct NullVerifier {
    accept: Arc<AtomicBool>,
}

impl NullVerifier {
    pub fn accepting() -> Self {
        Self {
            accept: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            accept: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }
}

impl RebaseVerifier for NullVerifier {
    fn verify(&self, _encoded_payload: &[u8], _signature: &Signature) -> bool {
        self.accept.load(Ordering::SeqCst)
    }
}
