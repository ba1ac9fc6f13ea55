//! Out-of-order rebase queue.
//!
//! A validly-signed rebase that arrives ahead of its predecessor waits here,
//! keyed by sequence number, until the sequence catches up to it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tranche_types::{RebaseRecord, Timestamp};

use crate::error::LedgerError;

/// A rebase waiting for its predecessors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledRebase {
    pub record: RebaseRecord,
    /// When the entry was queued.
    pub received_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RebaseQueue {
    entries: BTreeMap<u64, ScheduledRebase>,
    /// Maximum entries held at once.
    max_size: usize,
}

impl RebaseQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            max_size,
        }
    }

    /// Queue `record`. A sequence number is accepted once; a second record
    /// for it is rejected rather than replacing the first.
    pub fn insert(&mut self, record: RebaseRecord, now: Timestamp) -> Result<(), LedgerError> {
        let seq = record.sequence_number;
        if self.entries.contains_key(&seq) {
            return Err(LedgerError::AlreadyScheduled(seq));
        }
        if self.entries.len() >= self.max_size {
            return Err(LedgerError::QueueFull {
                capacity: self.max_size,
            });
        }
        self.entries.insert(
            seq,
            ScheduledRebase {
                record,
                received_at: now,
            },
        );
        Ok(())
    }

    pub fn get(&self, sequence_number: u64) -> Option<&ScheduledRebase> {
        self.entries.get(&sequence_number)
    }

    pub fn remove(&mut self, sequence_number: u64) -> Option<ScheduledRebase> {
        self.entries.remove(&sequence_number)
    }

    /// Drop every entry at or below `sequence_number`. Returns how many were
    /// removed.
    pub fn prune_applied(&mut self, sequence_number: u64) -> usize {
        let keep = self.entries.split_off(&sequence_number.saturating_add(1));
        let removed = self.entries.len();
        self.entries = keep;
        removed
    }

    pub fn sequence_numbers(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    pub fn set_capacity(&mut self, max_size: usize) {
        self.max_size = max_size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(seq: u64) -> RebaseRecord {
        RebaseRecord {
            sequence_number: seq,
            is_natural: false,
            underlying_value: 3,
            tranche_x_value: 1,
        }
    }

    #[test]
    fn insert_and_take() {
        let mut queue = RebaseQueue::new(4);
        queue.insert(record(3), Timestamp::new(7)).unwrap();
        assert_eq!(queue.get(3).unwrap().received_at, Timestamp::new(7));
        assert!(queue.get(2).is_none());
        assert_eq!(queue.remove(3).unwrap().record, record(3));
        assert!(queue.is_empty());
    }

    #[test]
    fn duplicate_sequence_rejected() {
        let mut queue = RebaseQueue::new(4);
        queue.insert(record(5), Timestamp::EPOCH).unwrap();
        assert_eq!(
            queue.insert(record(5), Timestamp::EPOCH),
            Err(LedgerError::AlreadyScheduled(5))
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn capacity_enforced() {
        let mut queue = RebaseQueue::new(2);
        queue.insert(record(2), Timestamp::EPOCH).unwrap();
        queue.insert(record(3), Timestamp::EPOCH).unwrap();
        assert_eq!(
            queue.insert(record(4), Timestamp::EPOCH),
            Err(LedgerError::QueueFull { capacity: 2 })
        );
    }

    #[test]
    fn prune_drops_stale_entries() {
        let mut queue = RebaseQueue::new(8);
        for seq in [2, 3, 5, 9] {
            queue.insert(record(seq), Timestamp::EPOCH).unwrap();
        }
        assert_eq!(queue.prune_applied(5), 3);
        assert_eq!(queue.sequence_numbers().collect::<Vec<_>>(), vec![9]);
    }
}
