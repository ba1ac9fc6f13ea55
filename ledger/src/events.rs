//! Events the ledger records for observers.

use tranche_math::FeeParameters;
use tranche_types::{Address, Leg, RateLimitParams};

use crate::gates::Gate;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    /// Underlying deposited; `shares` of each leg minted to `receiver`.
    Deposit {
        sender: Address,
        receiver: Address,
        assets: u128,
        shares: u128,
        fee: u128,
    },
    /// Pairs burned from `owner` and underlying released to `receiver`.
    Withdraw {
        sender: Address,
        receiver: Address,
        owner: Address,
        assets: u128,
        shares: u128,
    },
    Transfer {
        leg: Leg,
        from: Address,
        to: Address,
        amount: u128,
    },
    Approval {
        leg: Leg,
        owner: Address,
        spender: Address,
        amount: u128,
    },
    /// A holder was settled against a newer index.
    RebaseApplied {
        holder: Address,
        old_balance_x: u128,
        old_balance_y: u128,
        new_balance_x: u128,
        new_balance_y: u128,
    },
    /// A rebase record moved the global index.
    Rebase {
        sequence_number: u64,
        is_natural: bool,
        underlying_value: u128,
        tranche_x_value: u128,
        fee_factor: u128,
    },
    /// The index ran low on precision and restarted in a new epoch.
    IndexRenormalized { epoch: u64, sequence_number: u64 },
    /// A rebase arrived ahead of its predecessor and was queued.
    RebaseScheduled { sequence_number: u64 },
    FeeParametersUpdated { params: FeeParameters },
    CircuitBreakerToggled { gate: Gate, tripped: bool },
    DepositRateLimitUpdated { limit: Option<RateLimitParams> },
    SanctionsListUpdated { installed: bool },
    SequencerUpdated { previous: Address, new: Address },
    WrapperUpdated { wrapper: Option<Address> },
    OwnershipTransferred { previous: Address, new: Address },
    FeesCollected { receiver: Address, amount: u128 },
}

/// Synchronous fan-out of events to subscribers.
///
/// Listeners run inline on the publishing thread; keep them fast. The
/// sequencer reuses it for its own event type.
pub struct EventBus<E = LedgerEvent> {
    listeners: Vec<Box<dyn Fn(&E) + Send + Sync>>,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&E) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}
