//! Assembly of ledger, tranches and sequencer into one protocol instance.

use serde::{Deserialize, Serialize};
use tracing::info;
use tranche_crypto::RebaseVerifier;
use tranche_ledger::{Ledger, LedgerEvent, RebaseDisposition, UnderlyingAsset};
use tranche_sequencer::{OperationExecutor, Sequencer, SequencerEvent};
use tranche_token::Tranche;
use tranche_types::{Address, Leg, Signature, Timestamp};

use crate::config::NodeConfig;
use crate::NodeError;

/// Point-in-time view of the protocol's global state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolStatus {
    pub rebase_number: u64,
    pub next_sequence_number: u64,
    pub last_time_stamp: Timestamp,
    pub next_natural_rebase: Timestamp,
    pub queued_rebases: usize,
    pub total_supply_x: u128,
    pub total_supply_y: u128,
    pub custody: u128,
    pub accrued_fees: u128,
}

/// Everything a host drives.
///
/// Fields are public so callers can borrow the ledger mutably alongside a
/// tranche or the sequencer.
pub struct Protocol<A: UnderlyingAsset, V, E> {
    pub ledger: Ledger<A>,
    pub tranche_x: Tranche,
    pub tranche_y: Tranche,
    pub sequencer: Sequencer<V, E>,
}

impl<A, V, E> Protocol<A, V, E>
where
    A: UnderlyingAsset,
    V: RebaseVerifier,
    E: OperationExecutor,
{
    /// Build a protocol from `config`. The natural-rebase schedule starts at
    /// the configured genesis, or `now`.
    pub fn new(config: &NodeConfig, asset: A, verifier: V, executor: E, now: Timestamp) -> Result<Self, NodeError> {
        config.validate()?;
        let roles = &config.roles;
        let genesis = config.genesis(now);
        let ledger = Ledger::new(roles.into(), asset, config.params.clone(), genesis)?;
        let sequencer = Sequencer::new(roles.sequencer.clone(), roles.owner.clone(), verifier, executor);
        info!(
            ledger = %roles.ledger,
            x = %config.tranche_x.symbol,
            y = %config.tranche_y.symbol,
            genesis = %genesis,
            "protocol assembled"
        );
        Ok(Self {
            ledger,
            tranche_x: Tranche::new(roles.tranche_x.clone(), Leg::X, config.tranche_x.clone()),
            tranche_y: Tranche::new(roles.tranche_y.clone(), Leg::Y, config.tranche_y.clone()),
            sequencer,
        })
    }

    pub fn tranche(&self, leg: Leg) -> &Tranche {
        match leg {
            Leg::X => &self.tranche_x,
            Leg::Y => &self.tranche_y,
        }
    }

    /// The facade of `leg` together with the ledger it drives.
    pub fn facade(&mut self, leg: Leg) -> (&Tranche, &mut Ledger<A>) {
        let tranche = match leg {
            Leg::X => &self.tranche_x,
            Leg::Y => &self.tranche_y,
        };
        (tranche, &mut self.ledger)
    }

    pub fn rebase(&mut self, encoded: &[u8], signature: &Signature, now: Timestamp) -> Result<RebaseDisposition, NodeError> {
        Ok(self.sequencer.rebase(&mut self.ledger, encoded, signature, now)?)
    }

    pub fn execute_scheduled_rebases(&mut self, now: Timestamp) -> Result<Vec<u64>, NodeError> {
        Ok(self.sequencer.execute_scheduled_rebases(&mut self.ledger, now)?)
    }

    /// Deposit through the facade of `leg`; both legs are credited either way.
    pub fn deposit(
        &mut self,
        leg: Leg,
        sender: &Address,
        assets: u128,
        receiver: &Address,
        now: Timestamp,
    ) -> Result<u128, NodeError> {
        let (tranche, ledger) = self.facade(leg);
        Ok(tranche.deposit(ledger, sender, assets, receiver, now)?)
    }

    pub fn balances_of(&self, holder: &Address) -> Result<(u128, u128), NodeError> {
        Ok(self.ledger.balances_of(holder)?)
    }

    pub fn status(&self) -> Result<ProtocolStatus, NodeError> {
        Ok(ProtocolStatus {
            rebase_number: self.ledger.rebase_number(),
            next_sequence_number: self.ledger.next_sequence_number(),
            last_time_stamp: self.ledger.last_time_stamp(),
            next_natural_rebase: self.ledger.next_natural_rebase(),
            queued_rebases: self.ledger.scheduled_rebases().len(),
            total_supply_x: self.ledger.total_supply(Leg::X)?,
            total_supply_y: self.ledger.total_supply(Leg::Y)?,
            custody: self.ledger.custody(),
            accrued_fees: self.ledger.accrued_fees()?,
        })
    }

    /// Take and publish buffered events of both components.
    pub fn drain_events(&mut self) -> (Vec<LedgerEvent>, Vec<SequencerEvent>) {
        (self.ledger.drain_events(), self.sequencer.drain_events())
    }
}
