//! Checkpoint and restore of the state a rebase call can touch.
//!
//! Rebases never write holder snapshots, so a checkpoint only needs the
//! index, the epoch archive, the supply aggregate, the fee horizon, the
//! queue and the length of the event log. The sequencer takes one before
//! applying a rebase and restores it if the post-rebase operations fail.

use tracing::warn;
use tranche_math::{GlobalIndex, UserSnapshot};
use tranche_types::Timestamp;

use crate::asset::UnderlyingAsset;
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::queue::RebaseQueue;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerCheckpoint {
    index: GlobalIndex,
    epochs_len: usize,
    supply: UserSnapshot,
    fee_horizon: Timestamp,
    queue: RebaseQueue,
    events_len: usize,
    holder_writes: u64,
}

impl LedgerCheckpoint {
    /// Sequence number at the time of the checkpoint.
    pub fn sequence_number(&self) -> u64 {
        self.index.sequence_number
    }
}

impl<A: UnderlyingAsset> Ledger<A> {
    pub fn checkpoint(&self) -> LedgerCheckpoint {
        LedgerCheckpoint {
            index: self.index,
            epochs_len: self.epochs.len(),
            supply: self.supply,
            fee_horizon: self.fee_horizon,
            queue: self.queue.clone(),
            events_len: self.events.len(),
            holder_writes: self.holder_writes,
        }
    }

    /// Roll rebase state back to `checkpoint`, discarding events recorded
    /// since. Used by the sequencer to undo a rebase whose post-rebase
    /// operations failed.
    ///
    /// Refused once any holder has been written after the checkpoint: that
    /// holder's snapshot could be ahead of the restored index, and the
    /// supply aggregate would no longer cover it.
    pub fn restore(&mut self, checkpoint: LedgerCheckpoint) -> Result<(), LedgerError> {
        if self.holder_writes != checkpoint.holder_writes {
            warn!(
                checkpoint = checkpoint.sequence_number(),
                current = self.index.sequence_number,
                "restore refused, holders written since checkpoint"
            );
            return Err(LedgerError::CheckpointSuperseded {
                sequence: checkpoint.sequence_number(),
            });
        }
        self.rewind(checkpoint);
        Ok(())
    }

    pub(crate) fn rewind(&mut self, checkpoint: LedgerCheckpoint) {
        warn!(
            from = self.index.sequence_number,
            to = checkpoint.index.sequence_number,
            "ledger restored to checkpoint"
        );
        self.index = checkpoint.index;
        self.epochs.truncate(checkpoint.epochs_len);
        self.supply = checkpoint.supply;
        self.fee_horizon = checkpoint.fee_horizon;
        self.queue = checkpoint.queue;
        self.events.truncate(checkpoint.events_len);
    }
}
