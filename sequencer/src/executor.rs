//! Dispatch of post-rebase operations.

use tranche_types::Address;

use crate::error::ExecutionFailure;

/// Capability to run `(destination, calldata)` commands after a rebase.
///
/// Execution is two-phase: `execute` stages each call, then the sequencer
/// either `commit`s the whole batch or `abort`s it when any call (or the
/// rebase itself) failed. An implementation must leave no trace of staged
/// calls after `abort`.
pub trait OperationExecutor: Send {
    fn execute(&mut self, destination: &Address, data: &[u8]) -> Result<(), ExecutionFailure>;

    fn commit(&mut self);

    fn abort(&mut self);
}

impl<E: OperationExecutor + ?Sized> OperationExecutor for Box<E> {
    fn execute(&mut self, destination: &Address, data: &[u8]) -> Result<(), ExecutionFailure> {
        (**self).execute(destination, data)
    }

    fn commit(&mut self) {
        (**self).commit()
    }

    fn abort(&mut self) {
        (**self).abort()
    }
}
