//! Errors raised while constructing or validating shared types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid protocol parameter: {0}")]
    InvalidParams(String),

    #[error("signature must be 64 bytes, got {0}")]
    InvalidSignatureLength(usize),

    #[error("public key must be 32 bytes, got {0}")]
    InvalidKeyLength(usize),
}
