//! Signed-rebase intake and the post-rebase batch.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tranche_crypto::RebaseVerifier;
use tranche_ledger::{EventBus, Ledger, LedgerCheckpoint, RebaseDisposition, UnderlyingAsset};
use tranche_types::{Address, RebaseRecord, Signature, Timestamp};

use crate::error::SequencerError;
use crate::executor::OperationExecutor;
use crate::message::decode_payload;
use crate::operations::{Operation, OperationList};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequencerEvent {
    RebaseAccepted { sequence_number: u64, applied: Vec<u64> },
    RebaseQueued { sequence_number: u64 },
    OperationsExecuted { executed: usize, skipped: usize },
    OperationAdded { index: usize, destination: Address },
    OperationRemoved { index: usize, destination: Address },
    OperationStatusChanged { index: usize, destination: Address, enabled: bool },
    VerifierUpdated,
    OwnershipTransferred { previous: Address, new: Address },
}

/// Front door for rebases.
///
/// Owns the signer check and the operation list. The ledger is passed into
/// each call, so the host decides how the two are stored and serialized.
pub struct Sequencer<V, E> {
    address: Address,
    owner: Address,
    verifier: V,
    executor: E,
    operations: OperationList,
    events: Vec<SequencerEvent>,
    bus: EventBus<SequencerEvent>,
}

impl<V: RebaseVerifier, E: OperationExecutor> Sequencer<V, E> {
    /// `address` must be the sequencer role registered with the ledger.
    pub fn new(address: Address, owner: Address, verifier: V, executor: E) -> Self {
        Self {
            address,
            owner,
            verifier,
            executor,
            operations: OperationList::new(),
            events: Vec::new(),
            bus: EventBus::new(),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn operations(&self) -> &OperationList {
        &self.operations
    }

    pub fn operation(&self, index: usize) -> Option<&Operation> {
        self.operations.get(index)
    }

    // ── Rebase intake ────────────────────────────────────────────────────

    /// Submit a signed rebase payload.
    ///
    /// The payload is decoded and its signature checked before the ledger
    /// sees it. If the call applied anything, the operation list runs
    /// afterwards; a failing operation rolls the rebase back too.
    pub fn rebase<A: UnderlyingAsset>(
        &mut self,
        ledger: &mut Ledger<A>,
        encoded: &[u8],
        signature: &Signature,
        now: Timestamp,
    ) -> Result<RebaseDisposition, SequencerError> {
        let record = decode_payload(encoded)?;
        if !self.verifier.verify(encoded, signature) {
            warn!(sequence = record.sequence_number, "rebase signature rejected");
            return Err(SequencerError::InvalidSignature {
                sequence: record.sequence_number,
            });
        }
        self.submit(ledger, record, now)
    }

    /// Drain queued rebases that have become contiguous. Open to anyone;
    /// the work per call is bounded by the ledger's ceiling.
    pub fn execute_scheduled_rebases<A: UnderlyingAsset>(
        &mut self,
        ledger: &mut Ledger<A>,
        now: Timestamp,
    ) -> Result<Vec<u64>, SequencerError> {
        let checkpoint = ledger.checkpoint();
        let events_len = self.events.len();
        let applied = ledger.execute_scheduled_rebases(&self.address, now)?;
        if applied.is_empty() {
            return Ok(applied);
        }
        self.after_rebase(ledger, checkpoint, events_len)?;
        info!(applied = ?applied, "scheduled rebases applied");
        Ok(applied)
    }

    fn submit<A: UnderlyingAsset>(
        &mut self,
        ledger: &mut Ledger<A>,
        record: RebaseRecord,
        now: Timestamp,
    ) -> Result<RebaseDisposition, SequencerError> {
        let checkpoint = ledger.checkpoint();
        let events_len = self.events.len();
        let disposition = ledger.execute_rebase(&self.address, record, now)?;
        match &disposition {
            RebaseDisposition::Scheduled(seq) => {
                debug!(sequence = seq, "rebase queued");
                self.events.push(SequencerEvent::RebaseQueued { sequence_number: *seq });
            }
            RebaseDisposition::Applied(applied) => {
                self.events.push(SequencerEvent::RebaseAccepted {
                    sequence_number: record.sequence_number,
                    applied: applied.clone(),
                });
                self.after_rebase(ledger, checkpoint, events_len)?;
                info!(sequence = record.sequence_number, applied = ?applied, "rebase accepted");
            }
        }
        Ok(disposition)
    }

    /// Run the enabled operations in order. Any failure aborts the executor
    /// and rolls the ledger back to `checkpoint`.
    fn after_rebase<A: UnderlyingAsset>(
        &mut self,
        ledger: &mut Ledger<A>,
        checkpoint: LedgerCheckpoint,
        events_len: usize,
    ) -> Result<(), SequencerError> {
        let mut executed = 0;
        let mut skipped = 0;
        for (index, op) in self.operations.iter().enumerate() {
            if !op.enabled {
                skipped += 1;
                continue;
            }
            if let Err(reason) = self.executor.execute(&op.destination, &op.data) {
                warn!(index, destination = %op.destination, %reason, "post-rebase operation failed, rolling back");
                self.executor.abort();
                self.events.truncate(events_len);
                ledger.restore(checkpoint)?;
                return Err(SequencerError::OperationFailed {
                    index,
                    destination: op.destination.clone(),
                    reason,
                });
            }
            executed += 1;
        }
        self.executor.commit();
        if executed + skipped > 0 {
            debug!(executed, skipped, "post-rebase operations committed");
            self.events.push(SequencerEvent::OperationsExecuted { executed, skipped });
        }
        Ok(())
    }

    // ── Owner administration ─────────────────────────────────────────────

    fn require_owner(&self, caller: &Address) -> Result<(), SequencerError> {
        if *caller != self.owner {
            return Err(SequencerError::Unauthorized(caller.clone()));
        }
        Ok(())
    }

    pub fn add_operation(
        &mut self,
        caller: &Address,
        index: usize,
        destination: Address,
        data: Vec<u8>,
    ) -> Result<(), SequencerError> {
        self.require_owner(caller)?;
        self.operations.insert(index, destination.clone(), data)?;
        info!(index, destination = %destination, "operation added");
        self.events.push(SequencerEvent::OperationAdded { index, destination });
        Ok(())
    }

    pub fn remove_operation(&mut self, caller: &Address, index: usize) -> Result<Operation, SequencerError> {
        self.require_owner(caller)?;
        let removed = self.operations.remove(index)?;
        info!(index, destination = %removed.destination, "operation removed");
        self.events.push(SequencerEvent::OperationRemoved {
            index,
            destination: removed.destination.clone(),
        });
        Ok(removed)
    }

    pub fn set_operation_enabled(
        &mut self,
        caller: &Address,
        index: usize,
        destination: &Address,
        enabled: bool,
    ) -> Result<(), SequencerError> {
        self.require_owner(caller)?;
        self.operations.set_enabled(index, destination, enabled)?;
        info!(index, destination = %destination, enabled, "operation status changed");
        self.events.push(SequencerEvent::OperationStatusChanged {
            index,
            destination: destination.clone(),
            enabled,
        });
        Ok(())
    }

    /// Rotate the rebase signer.
    pub fn set_verifier(&mut self, caller: &Address, verifier: V) -> Result<(), SequencerError> {
        self.require_owner(caller)?;
        self.verifier = verifier;
        info!("rebase verifier rotated");
        self.events.push(SequencerEvent::VerifierUpdated);
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> Result<(), SequencerError> {
        self.require_owner(caller)?;
        let previous = std::mem::replace(&mut self.owner, new_owner.clone());
        info!(previous = %previous, new = %new_owner, "sequencer ownership transferred");
        self.events.push(SequencerEvent::OwnershipTransferred {
            previous,
            new: new_owner,
        });
        Ok(())
    }

    // ── Events ───────────────────────────────────────────────────────────

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&SequencerEvent) + Send + Sync>) {
        self.bus.subscribe(listener);
    }

    /// Take the buffered events, publishing each to subscribers.
    pub fn drain_events(&mut self) -> Vec<SequencerEvent> {
        let events = std::mem::take(&mut self.events);
        for event in &events {
            self.bus.emit(event);
        }
        events
    }

    pub fn pending_events(&self) -> &[SequencerEvent] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tranche_crypto::{keypair_from_seed, sign_digest, Ed25519Verifier};
    use tranche_ledger::{AssetError, Gate, LedgerError, LedgerRoles};
    use tranche_types::{KeyPair, ProtocolParams};

    use crate::error::ExecutionFailure;
    use crate::message::encode_payload;

    const WAD: u128 = 1_000_000_000_000_000_000;
    const DAY: u64 = 86_400;

    fn addr(raw: &str) -> Address {
        Address::new(raw)
    }

    #[derive(Default)]
    struct Asset(HashMap<Address, u128>);

    impl UnderlyingAsset for Asset {
        fn address(&self) -> Address {
            addr("underlying")
        }

        fn balance_of(&self, account: &Address) -> u128 {
            self.0.get(account).copied().unwrap_or(0)
        }

        fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), AssetError> {
            let available = self.balance_of(from);
            if available < amount {
                return Err(AssetError::InsufficientFunds {
                    account: from.clone(),
                    available,
                    requested: amount,
                });
            }
            *self.0.entry(from.clone()).or_default() -= amount;
            *self.0.entry(to.clone()).or_default() += amount;
            Ok(())
        }
    }

    /// Stages calls; fails on destinations listed in `failing`.
    #[derive(Default)]
    struct Recorder {
        staged: Vec<Address>,
        committed: Vec<Address>,
        aborts: usize,
        failing: Vec<Address>,
    }

    impl OperationExecutor for Recorder {
        fn execute(&mut self, destination: &Address, _data: &[u8]) -> Result<(), ExecutionFailure> {
            if self.failing.contains(destination) {
                return Err(ExecutionFailure("reverted".into()));
            }
            self.staged.push(destination.clone());
            Ok(())
        }

        fn commit(&mut self) {
            self.committed.append(&mut self.staged);
        }

        fn abort(&mut self) {
            self.staged.clear();
            self.aborts += 1;
        }
    }

    struct Fixture {
        ledger: Ledger<Asset>,
        sequencer: Sequencer<Ed25519Verifier, Recorder>,
        signer: KeyPair,
    }

    fn fixture() -> Fixture {
        let roles = LedgerRoles {
            ledger: addr("ledger"),
            owner: addr("owner"),
            sequencer: addr("sequencer"),
            tranche_x: addr("tranche-x"),
            tranche_y: addr("tranche-y"),
        };
        let ledger = Ledger::new(roles, Asset::default(), ProtocolParams::default(), Timestamp::EPOCH).unwrap();
        let signer = keypair_from_seed(&[7u8; 32]);
        let sequencer = Sequencer::new(
            addr("sequencer"),
            addr("owner"),
            Ed25519Verifier::new(signer.public.clone()),
            Recorder::default(),
        );
        Fixture {
            ledger,
            sequencer,
            signer,
        }
    }

    fn record(seq: u64, natural: bool) -> RebaseRecord {
        RebaseRecord {
            sequence_number: seq,
            is_natural: natural,
            underlying_value: 3 * WAD,
            tranche_x_value: WAD,
        }
    }

    impl Fixture {
        fn submit(&mut self, record: RebaseRecord, now: u64) -> Result<RebaseDisposition, SequencerError> {
            let payload = encode_payload(&record);
            let sig = sign_digest(&payload, &self.signer.private);
            self.sequencer
                .rebase(&mut self.ledger, &payload, &sig, Timestamp::new(now))
        }
    }

    #[test]
    fn applies_next_in_sequence() {
        let mut f = fixture();
        assert_eq!(f.submit(record(1, false), 10).unwrap(), RebaseDisposition::Applied(vec![1]));
        assert_eq!(f.ledger.next_sequence_number(), 2);
    }

    #[test]
    fn rejects_foreign_signature() {
        let mut f = fixture();
        let payload = encode_payload(&record(1, false));
        let impostor = keypair_from_seed(&[8u8; 32]);
        let sig = sign_digest(&payload, &impostor.private);
        assert_eq!(
            f.sequencer.rebase(&mut f.ledger, &payload, &sig, Timestamp::new(10)),
            Err(SequencerError::InvalidSignature { sequence: 1 })
        );
        assert_eq!(f.ledger.rebase_number(), 0);
    }

    #[test]
    fn gap_queues_then_cascades() {
        let mut f = fixture();
        f.submit(record(1, false), 10).unwrap();
        assert_eq!(f.submit(record(3, false), 10).unwrap(), RebaseDisposition::Scheduled(3));
        assert_eq!(f.ledger.next_sequence_number(), 2);
        assert!(f.ledger.scheduled_rebase(3).is_some());

        assert_eq!(
            f.submit(record(2, false), 10).unwrap(),
            RebaseDisposition::Applied(vec![2, 3])
        );
        assert_eq!(f.ledger.next_sequence_number(), 4);
        assert!(f.ledger.scheduled_rebase(3).is_none());
    }

    #[test]
    fn stale_sequence_rejected() {
        let mut f = fixture();
        f.submit(record(1, false), 10).unwrap();
        assert_eq!(
            f.submit(record(1, false), 10),
            Err(SequencerError::Ledger(LedgerError::SequenceAlreadyApplied {
                sequence: 1,
                current: 1
            }))
        );
    }

    #[test]
    fn natural_rebase_waits_for_interval() {
        let mut f = fixture();
        assert!(matches!(
            f.submit(record(1, true), DAY - 1),
            Err(SequencerError::Ledger(LedgerError::NaturalRebaseTooEarly { .. }))
        ));
        assert!(f.submit(record(1, true), DAY).is_ok());
    }

    #[test]
    fn operations_run_only_after_applied_rebases() {
        let mut f = fixture();
        f.sequencer
            .add_operation(&addr("owner"), 0, addr("pool"), vec![1])
            .unwrap();
        f.sequencer
            .add_operation(&addr("owner"), 1, addr("oracle"), vec![2])
            .unwrap();
        f.sequencer
            .set_operation_enabled(&addr("owner"), 1, &addr("oracle"), false)
            .unwrap();

        f.submit(record(2, false), 10).unwrap();
        assert!(f.sequencer.executor().committed.is_empty());

        f.submit(record(1, false), 10).unwrap();
        assert_eq!(f.sequencer.executor().committed, vec![addr("pool")]);
        assert!(f
            .sequencer
            .pending_events()
            .contains(&SequencerEvent::OperationsExecuted { executed: 1, skipped: 1 }));
    }

    #[test]
    fn failing_operation_rolls_back_rebase() {
        let mut f = fixture();
        f.sequencer
            .add_operation(&addr("owner"), 0, addr("pool"), vec![])
            .unwrap();
        f.sequencer
            .add_operation(&addr("owner"), 1, addr("broken"), vec![])
            .unwrap();
        f.sequencer.executor.failing.push(addr("broken"));
        f.submit(record(2, false), 10).unwrap();
        let index_before = *f.ledger.global_index();
        let events_before = f.sequencer.pending_events().len();

        let err = f.submit(record(1, false), 10).unwrap_err();
        assert!(matches!(err, SequencerError::OperationFailed { index: 1, .. }));
        assert_eq!(*f.ledger.global_index(), index_before);
        assert!(f.ledger.scheduled_rebase(2).is_some());
        assert_eq!(f.sequencer.executor().aborts, 1);
        assert!(f.sequencer.executor().committed.is_empty());
        assert_eq!(f.sequencer.pending_events().len(), events_before);
    }

    #[test]
    fn owner_gates_administration() {
        let mut f = fixture();
        let stranger = addr("mallory");
        assert_eq!(
            f.sequencer.add_operation(&stranger, 0, addr("pool"), vec![]),
            Err(SequencerError::Unauthorized(stranger.clone()))
        );
        assert!(f.sequencer.remove_operation(&stranger, 0).is_err());
        let other = keypair_from_seed(&[9u8; 32]);
        assert!(f
            .sequencer
            .set_verifier(&stranger, Ed25519Verifier::new(other.public.clone()))
            .is_err());

        f.sequencer
            .transfer_ownership(&addr("owner"), addr("dao"))
            .unwrap();
        assert_eq!(f.sequencer.owner(), &addr("dao"));
        assert!(f
            .sequencer
            .add_operation(&addr("owner"), 0, addr("pool"), vec![])
            .is_err());
    }

    #[test]
    fn rotated_signer_takes_effect() {
        let mut f = fixture();
        let next = keypair_from_seed(&[11u8; 32]);
        f.sequencer
            .set_verifier(&addr("owner"), Ed25519Verifier::new(next.public.clone()))
            .unwrap();
        assert_eq!(
            f.submit(record(1, false), 10),
            Err(SequencerError::InvalidSignature { sequence: 1 })
        );
        f.signer = next;
        assert!(f.submit(record(1, false), 10).is_ok());
    }

    #[test]
    fn scheduled_drain_runs_operations() {
        let mut f = fixture();
        f.sequencer
            .add_operation(&addr("owner"), 0, addr("pool"), vec![])
            .unwrap();
        for seq in 2..=8 {
            f.submit(record(seq, false), 10).unwrap();
        }
        let first = f.submit(record(1, false), 10).unwrap();
        assert_eq!(first.applied(), &[1, 2, 3, 4, 5]);

        let rest = f
            .sequencer
            .execute_scheduled_rebases(&mut f.ledger, Timestamp::new(10))
            .unwrap();
        assert_eq!(rest, vec![6, 7, 8]);
        assert_eq!(f.sequencer.executor().committed.len(), 2);

        let none = f
            .sequencer
            .execute_scheduled_rebases(&mut f.ledger, Timestamp::new(10))
            .unwrap();
        assert!(none.is_empty());
        assert_eq!(f.sequencer.executor().committed.len(), 2);
    }

    #[test]
    fn rebase_breaker_blocks_intake() {
        let mut f = fixture();
        f.ledger
            .set_circuit_breaker(&addr("owner"), Gate::Rebase, true)
            .unwrap();
        assert_eq!(
            f.submit(record(1, false), 10),
            Err(SequencerError::Ledger(LedgerError::CircuitBreakerActive(Gate::Rebase)))
        );
    }

    #[test]
    fn drained_events_reach_subscribers() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let mut f = fixture();
        let seen = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&seen);
        f.sequencer.subscribe(Box::new(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        }));
        f.submit(record(1, false), 10).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        let drained = f.sequencer.drain_events();
        assert_eq!(seen.load(Ordering::SeqCst), drained.len());
        assert!(f.sequencer.pending_events().is_empty());
    }
}
