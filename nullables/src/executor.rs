//! Nullable operation executor.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tranche_sequencer::{ExecutionFailure, OperationExecutor};
use tranche_types::Address;

use crate::lock;

/// A call the executor has seen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutedCall {
    pub destination: Address,
    pub data: Vec<u8>,
}

#[derive(Default)]
struct Journal {
    staged: Vec<ExecutedCall>,
    committed: Vec<ExecutedCall>,
    failing: HashSet<Address>,
    aborts: usize,
}

/// Records calls, staging them until the batch commits.
#[derive(Clone, Default)]
pub struct NullExecutor {
    journal: Arc<Mutex<Journal>>,
}

impl NullExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make calls to `destination` fail from now on.
    pub fn fail_on(&self, destination: &Address) {
        lock(&self.journal).failing.insert(destination.clone());
    }

    pub fn heal(&self, destination: &Address) {
        lock(&self.journal).failing.remove(destination);
    }

    /// Calls from committed batches, in order.
    pub fn committed(&self) -> Vec<ExecutedCall> {
        lock(&self.journal).committed.clone()
    }

    pub fn aborts(&self) -> usize {
        lock(&self.journal).aborts
    }
}

impl OperationExecutor for NullExecutor {
    fn execute(&mut self, destination: &Address, data: &[u8]) -> Result<(), ExecutionFailure> {
        let mut journal = lock(&self.journal);
        if journal.failing.contains(destination) {
            return Err(ExecutionFailure(format!("{destination} reverted")));
        }
        journal.staged.push(ExecutedCall {
            destination: destination.clone(),
            data: data.to_vec(),
        });
        Ok(())
    }

    fn commit(&mut self) {
        let mut journal = lock(&self.journal);
        let staged = std::mem::take(&mut journal.staged);
        journal.committed.extend(staged);
    }

    fn abort(&mut self) {
        let mut journal = lock(&self.journal);
        journal.staged.clear();
        journal.aborts += 1;
    }
}
