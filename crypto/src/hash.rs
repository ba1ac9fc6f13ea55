//! Blake2b hashing of rebase payloads.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

type Blake2b256 = Blake2b<U32>;

/// Domain tag mixed into every rebase digest so a signature over some other
/// 128-byte message can never be replayed as a rebase.
const REBASE_DOMAIN: &[u8] = b"tranche.rebase.v1";

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    finish(hasher)
}

/// Hash multiple byte slices in sequence without concatenating them.
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    finish(hasher)
}

fn finish(hasher: Blake2b256) -> [u8; 32] {
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Digest that the rebase signer signs: domain tag followed by the exact
/// encoded payload bytes.
pub fn rebase_digest(encoded_payload: &[u8]) -> [u8; 32] {
    blake2b_256_multi(&[REBASE_DOMAIN, encoded_payload])
}
