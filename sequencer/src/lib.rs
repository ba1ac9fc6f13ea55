//! The rebase sequencer ("orchestrator").
//!
//! Accepts signed rebase payloads, checks them against the registered
//! signer, hands them to the ledger in order and, after any call that
//! actually moved the index, runs the owner's list of follow-up operations
//! as one all-or-nothing batch.

pub mod error;
pub mod executor;
pub mod message;
pub mod operations;
pub mod sequencer;

pub use error::{ExecutionFailure, SequencerError};
pub use executor::OperationExecutor;
pub use message::{decode_payload, encode_payload, PAYLOAD_LEN};
pub use operations::{Operation, OperationList};
pub use sequencer::{Sequencer, SequencerEvent};
