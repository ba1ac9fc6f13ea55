use thiserror::Error;
use tranche_ledger::LedgerError;
use tranche_types::Address;

/// Why a follow-up operation failed. Opaque to the sequencer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ExecutionFailure(pub String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SequencerError {
    // ── Ordering / authentication ──────────────────────────────────────
    #[error("rebase payload is malformed: {0}")]
    MalformedPayload(String),

    #[error("invalid signature on rebase {sequence}")]
    InvalidSignature { sequence: u64 },

    // ── Access ─────────────────────────────────────────────────────────
    #[error("caller {0} is not the sequencer owner")]
    Unauthorized(Address),

    // ── Bounds ─────────────────────────────────────────────────────────
    #[error("operation index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("operation {index} targets {actual}, not {expected}")]
    DestinationMismatch {
        index: usize,
        expected: Address,
        actual: Address,
    },

    // ── Composite ──────────────────────────────────────────────────────
    #[error("operation {index} on {destination} failed: {reason}")]
    OperationFailed {
        index: usize,
        destination: Address,
        reason: ExecutionFailure,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
