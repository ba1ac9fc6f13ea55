//! Rebase application: ordering, queueing, bounded cascade and fee charge.

use tracing::{debug, info, warn};
use tranche_math::{advance_index, interval_fee_factor, intervals_due, settle_aggregate, MathError};
use tranche_types::{Address, RebaseRecord, Timestamp};

use crate::asset::UnderlyingAsset;
use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::gates::Gate;
use crate::ledger::Ledger;

/// What a submitted rebase did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RebaseDisposition {
    /// Applied now: the submitted record followed by any cascaded ones.
    Applied(Vec<u64>),
    /// Queued until its predecessors arrive.
    Scheduled(u64),
}

impl RebaseDisposition {
    /// Sequence numbers applied by the call, in order.
    pub fn applied(&self) -> &[u64] {
        match self {
            RebaseDisposition::Applied(seqs) => seqs,
            RebaseDisposition::Scheduled(_) => &[],
        }
    }
}

impl<A: UnderlyingAsset> Ledger<A> {
    /// Submit a verified rebase record.
    ///
    /// The next expected record is applied, followed by queued successors
    /// up to `max_rebases_per_call` applications in total. A record ahead of
    /// the sequence is queued. Either everything the call applied sticks or
    /// nothing does.
    pub fn execute_rebase(
        &mut self,
        caller: &Address,
        record: RebaseRecord,
        now: Timestamp,
    ) -> Result<RebaseDisposition, LedgerError> {
        self.require_sequencer(caller)?;
        self.gates.breakers.check(Gate::Rebase)?;

        let current = self.index.sequence_number;
        let seq = record.sequence_number;
        if seq <= current {
            warn!(sequence = seq, current, "rebase already applied");
            return Err(LedgerError::SequenceAlreadyApplied {
                sequence: seq,
                current,
            });
        }
        if !record.has_valid_split() {
            return Err(MathError::InvalidRebaseValues {
                underlying: record.underlying_value,
                tranche_x: record.tranche_x_value,
            }
            .into());
        }

        if seq > self.index.next_sequence_number() {
            self.queue.insert(record, now)?;
            info!(
                sequence = seq,
                expected = self.index.next_sequence_number(),
                queued = self.queue.len(),
                "rebase scheduled"
            );
            self.emit(LedgerEvent::RebaseScheduled {
                sequence_number: seq,
            });
            return Ok(RebaseDisposition::Scheduled(seq));
        }

        let checkpoint = self.checkpoint();
        match self.apply_and_cascade(&record, now) {
            Ok(applied) => Ok(RebaseDisposition::Applied(applied)),
            Err(e) => {
                self.rewind(checkpoint);
                Err(e)
            }
        }
    }

    /// Drain queued rebases that have become contiguous, in bounded batches.
    /// Returns the sequence numbers applied, possibly none.
    pub fn execute_scheduled_rebases(
        &mut self,
        caller: &Address,
        now: Timestamp,
    ) -> Result<Vec<u64>, LedgerError> {
        self.require_sequencer(caller)?;
        self.gates.breakers.check(Gate::Rebase)?;

        let checkpoint = self.checkpoint();
        let mut applied = Vec::new();
        match self.cascade(&mut applied, now) {
            Ok(()) => {
                debug!(applied = applied.len(), remaining = self.queue.len(), "scheduled rebases executed");
                Ok(applied)
            }
            Err(e) => {
                self.rewind(checkpoint);
                Err(e)
            }
        }
    }

    fn apply_and_cascade(&mut self, record: &RebaseRecord, now: Timestamp) -> Result<Vec<u64>, LedgerError> {
        self.apply_rebase(record, now)?;
        self.queue.prune_applied(self.index.sequence_number);
        let mut applied = vec![record.sequence_number];
        self.cascade(&mut applied, now)?;
        Ok(applied)
    }

    /// Apply queued successors until the queue has a gap, a queued natural
    /// rebase is not yet due, or the per-call ceiling is reached.
    fn cascade(&mut self, applied: &mut Vec<u64>, now: Timestamp) -> Result<(), LedgerError> {
        let ceiling = self.params.max_rebases_per_call;
        while applied.len() < ceiling {
            let next = self.index.next_sequence_number();
            let Some(entry) = self.queue.get(next).copied() else {
                break;
            };
            if entry.record.is_natural && now < self.next_natural_rebase() {
                debug!(
                    sequence = next,
                    not_before = %self.next_natural_rebase(),
                    "queued natural rebase not yet due"
                );
                break;
            }
            self.apply_rebase(&entry.record, now)?;
            self.queue.remove(next);
            applied.push(next);
        }
        Ok(())
    }

    /// Move the index by one record. Nothing is written unless every step
    /// succeeds.
    fn apply_rebase(&mut self, record: &RebaseRecord, now: Timestamp) -> Result<(), LedgerError> {
        let interval = self.params.rebase_interval_secs;
        if record.is_natural {
            let not_before = self.next_natural_rebase();
            if now < not_before {
                warn!(sequence = record.sequence_number, %not_before, %now, "natural rebase too early");
                return Err(LedgerError::NaturalRebaseTooEarly {
                    sequence: record.sequence_number,
                    not_before,
                });
            }
        }

        // Intervals elapse whether or not fees are enabled, so enabling
        // fees later never charges for the disabled period.
        let intervals = intervals_due(self.fee_horizon, now, interval);
        let fee_factor = interval_fee_factor(self.fees.effective_rate(), interval, intervals)?;
        let next = advance_index(&self.index, record, fee_factor, interval)?;
        let mut supply = settle_aggregate(&next, &self.supply)?.consolidated();
        let fresh = if next.needs_renormalization() {
            let fresh = next.next_epoch()?;
            supply.last_index = fresh;
            Some(fresh)
        } else {
            None
        };

        self.index = fresh.unwrap_or(next);
        self.supply = supply;
        self.fee_horizon = self.fee_horizon.plus(intervals.saturating_mul(interval));
        if fresh.is_some() {
            self.epochs.push(next);
        }

        info!(
            sequence = record.sequence_number,
            natural = record.is_natural,
            underlying = record.underlying_value,
            tranche_x = record.tranche_x_value,
            fee_factor,
            fee_intervals = intervals,
            balance_factor_xy = next.balance_factor_xy,
            "rebase applied"
        );
        self.emit(LedgerEvent::Rebase {
            sequence_number: record.sequence_number,
            is_natural: record.is_natural,
            underlying_value: record.underlying_value,
            tranche_x_value: record.tranche_x_value,
            fee_factor,
        });
        if let Some(fresh) = fresh {
            info!(
                sequence = record.sequence_number,
                epoch = fresh.epoch,
                closed_balance_factor_xy = next.balance_factor_xy,
                closed_fee_index = next.fee_index,
                "index renormalized"
            );
            self.emit(LedgerEvent::IndexRenormalized {
                epoch: fresh.epoch,
                sequence_number: record.sequence_number,
            });
        }
        Ok(())
    }
}
