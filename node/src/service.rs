//! Serialized host for a [`Protocol`].
//!
//! A single tokio task owns the protocol and processes one request at a
//! time, stamping each with the clock's current time. Callers talk to it
//! through a cloneable [`ProtocolHandle`]; every request carries a oneshot
//! for its reply. The service stops when every handle has been dropped and
//! hands the protocol back through its join handle.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tranche_crypto::RebaseVerifier;
use tranche_ledger::{LedgerEvent, RebaseDisposition, UnderlyingAsset};
use tranche_sequencer::{OperationExecutor, SequencerEvent};
use tranche_types::{Address, Clock, Leg, Signature};

use crate::metrics::ProtocolMetrics;
use crate::protocol::{Protocol, ProtocolStatus};
use crate::NodeError;

type Reply<T> = oneshot::Sender<Result<T, NodeError>>;

/// Everything the service can be asked to do.
pub enum Request {
    Deposit {
        leg: Leg,
        sender: Address,
        assets: u128,
        receiver: Address,
        reply: Reply<u128>,
    },
    Mint {
        leg: Leg,
        sender: Address,
        shares: u128,
        receiver: Address,
        reply: Reply<u128>,
    },
    Withdraw {
        leg: Leg,
        sender: Address,
        assets: u128,
        receiver: Address,
        owner: Address,
        reply: Reply<u128>,
    },
    Redeem {
        leg: Leg,
        sender: Address,
        shares: u128,
        receiver: Address,
        owner: Address,
        reply: Reply<u128>,
    },
    Transfer {
        leg: Leg,
        sender: Address,
        to: Address,
        amount: u128,
        reply: Reply<()>,
    },
    Send {
        leg: Leg,
        sender: Address,
        to: Address,
        amount: u128,
        data: Vec<u8>,
        reply: Reply<()>,
    },
    Burn {
        leg: Leg,
        sender: Address,
        from: Address,
        amount: u128,
        reply: Reply<u128>,
    },
    TransferFrom {
        leg: Leg,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
        reply: Reply<()>,
    },
    Approve {
        leg: Leg,
        owner: Address,
        spender: Address,
        amount: u128,
        reply: Reply<()>,
    },
    Rebase {
        payload: Vec<u8>,
        signature: Signature,
        reply: Reply<RebaseDisposition>,
    },
    ExecuteScheduledRebases {
        reply: Reply<Vec<u64>>,
    },
    Balances {
        holder: Address,
        reply: Reply<(u128, u128)>,
    },
    Status {
        reply: Reply<ProtocolStatus>,
    },
    DrainEvents {
        reply: oneshot::Sender<(Vec<LedgerEvent>, Vec<SequencerEvent>)>,
    },
}

impl Request {
    fn kind(&self) -> &'static str {
        match self {
            Request::Deposit { .. } => "deposit",
            Request::Mint { .. } => "mint",
            Request::Withdraw { .. } => "withdraw",
            Request::Redeem { .. } => "redeem",
            Request::Transfer { .. } => "transfer",
            Request::Send { .. } => "send",
            Request::Burn { .. } => "burn",
            Request::TransferFrom { .. } => "transfer_from",
            Request::Approve { .. } => "approve",
            Request::Rebase { .. } => "rebase",
            Request::ExecuteScheduledRebases { .. } => "execute_scheduled_rebases",
            Request::Balances { .. } => "balances",
            Request::Status { .. } => "status",
            Request::DrainEvents { .. } => "drain_events",
        }
    }
}

pub struct ProtocolService<A: UnderlyingAsset, V, E> {
    protocol: Protocol<A, V, E>,
    clock: Arc<dyn Clock>,
    metrics: Arc<ProtocolMetrics>,
    rx: mpsc::Receiver<Request>,
}

impl<A, V, E> ProtocolService<A, V, E>
where
    A: UnderlyingAsset + 'static,
    V: RebaseVerifier + Send + 'static,
    E: OperationExecutor + 'static,
{
    /// Start the service on the current tokio runtime.
    pub fn spawn(
        protocol: Protocol<A, V, E>,
        clock: Arc<dyn Clock>,
        metrics: Arc<ProtocolMetrics>,
        queue: usize,
    ) -> (ProtocolHandle, JoinHandle<Protocol<A, V, E>>) {
        let (tx, rx) = mpsc::channel(queue.max(1));
        let service = Self {
            protocol,
            clock,
            metrics,
            rx,
        };
        let join = tokio::spawn(service.run());
        (ProtocolHandle { tx }, join)
    }

    async fn run(mut self) -> Protocol<A, V, E> {
        info!("protocol service started");
        while let Some(request) = self.rx.recv().await {
            self.handle(request);
        }
        info!("protocol service stopped");
        self.protocol
    }

    fn handle(&mut self, request: Request) {
        let kind = request.kind();
        let now = self.clock.now();
        let p = &mut self.protocol;
        let ok = match request {
            Request::Deposit {
                leg,
                sender,
                assets,
                receiver,
                reply,
            } => {
                let (tranche, ledger) = p.facade(leg);
                let result = tranche
                    .deposit(ledger, &sender, assets, &receiver, now)
                    .map_err(NodeError::from);
                respond(reply, result)
            }
            Request::Mint {
                leg,
                sender,
                shares,
                receiver,
                reply,
            } => {
                let (tranche, ledger) = p.facade(leg);
                let result = tranche
                    .mint(ledger, &sender, shares, &receiver, now)
                    .map_err(NodeError::from);
                respond(reply, result)
            }
            Request::Withdraw {
                leg,
                sender,
                assets,
                receiver,
                owner,
                reply,
            } => {
                let (tranche, ledger) = p.facade(leg);
                let result = tranche
                    .withdraw(ledger, &sender, assets, &receiver, &owner)
                    .map_err(NodeError::from);
                respond(reply, result)
            }
            Request::Redeem {
                leg,
                sender,
                shares,
                receiver,
                owner,
                reply,
            } => {
                let (tranche, ledger) = p.facade(leg);
                let result = tranche
                    .redeem(ledger, &sender, shares, &receiver, &owner)
                    .map_err(NodeError::from);
                respond(reply, result)
            }
            Request::Transfer {
                leg,
                sender,
                to,
                amount,
                reply,
            } => {
                let (tranche, ledger) = p.facade(leg);
                let result = tranche
                    .transfer(ledger, &sender, &to, amount)
                    .map_err(NodeError::from);
                respond(reply, result)
            }
            Request::Send {
                leg,
                sender,
                to,
                amount,
                data,
                reply,
            } => {
                let (tranche, ledger) = p.facade(leg);
                let result = tranche
                    .send(ledger, &sender, &to, amount, &data)
                    .map_err(NodeError::from);
                respond(reply, result)
            }
            Request::Burn {
                leg,
                sender,
                from,
                amount,
                reply,
            } => {
                let (tranche, ledger) = p.facade(leg);
                let result = tranche
                    .burn(ledger, &sender, &from, amount)
                    .map_err(NodeError::from);
                respond(reply, result)
            }
            Request::TransferFrom {
                leg,
                spender,
                from,
                to,
                amount,
                reply,
            } => {
                let (tranche, ledger) = p.facade(leg);
                let result = tranche
                    .transfer_from(ledger, &spender, &from, &to, amount)
                    .map_err(NodeError::from);
                respond(reply, result)
            }
            Request::Approve {
                leg,
                owner,
                spender,
                amount,
                reply,
            } => {
                let (tranche, ledger) = p.facade(leg);
                let result = tranche
                    .approve(ledger, &owner, &spender, amount)
                    .map_err(NodeError::from);
                respond(reply, result)
            }
            Request::Rebase {
                payload,
                signature,
                reply,
            } => {
                let result = p.rebase(&payload, &signature, now);
                match &result {
                    Ok(RebaseDisposition::Applied(applied)) => {
                        self.metrics.rebases_applied.inc_by(applied.len() as u64)
                    }
                    Ok(RebaseDisposition::Scheduled(_)) => self.metrics.rebases_scheduled.inc(),
                    Err(e) => {
                        warn!(error = %e, "rebase rejected");
                        self.metrics.rebases_rejected.inc();
                    }
                }
                respond(reply, result)
            }
            Request::ExecuteScheduledRebases { reply } => {
                let result = p.execute_scheduled_rebases(now);
                if let Ok(applied) = &result {
                    self.metrics.rebases_applied.inc_by(applied.len() as u64);
                }
                respond(reply, result)
            }
            Request::Balances { holder, reply } => respond(reply, p.balances_of(&holder)),
            Request::Status { reply } => respond(reply, p.status()),
            Request::DrainEvents { reply } => {
                let _ = reply.send(p.drain_events());
                true
            }
        };
        self.metrics.record_request(kind, ok);
        self.metrics
            .sequence_number
            .set(self.protocol.ledger.rebase_number() as i64);
        self.metrics
            .queued_rebases
            .set(self.protocol.ledger.scheduled_rebases().len() as i64);
        debug!(kind, ok, %now, "request handled");
    }
}

/// Send `result` back; a caller that gave up waiting is not an error.
fn respond<T>(reply: Reply<T>, result: Result<T, NodeError>) -> bool {
    let ok = result.is_ok();
    let _ = reply.send(result);
    ok
}

/// Cloneable client of a running [`ProtocolService`].
#[derive(Clone)]
pub struct ProtocolHandle {
    tx: mpsc::Sender<Request>,
}

impl ProtocolHandle {
    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Request) -> Result<T, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| NodeError::ServiceStopped)?;
        rx.await.map_err(|_| NodeError::ServiceStopped)?
    }

    pub async fn deposit(&self, leg: Leg, sender: Address, assets: u128, receiver: Address) -> Result<u128, NodeError> {
        self.call(|reply| Request::Deposit {
            leg,
            sender,
            assets,
            receiver,
            reply,
        })
        .await
    }

    pub async fn mint(&self, leg: Leg, sender: Address, shares: u128, receiver: Address) -> Result<u128, NodeError> {
        self.call(|reply| Request::Mint {
            leg,
            sender,
            shares,
            receiver,
            reply,
        })
        .await
    }

    pub async fn withdraw(
        &self,
        leg: Leg,
        sender: Address,
        assets: u128,
        receiver: Address,
        owner: Address,
    ) -> Result<u128, NodeError> {
        self.call(|reply| Request::Withdraw {
            leg,
            sender,
            assets,
            receiver,
            owner,
            reply,
        })
        .await
    }

    pub async fn redeem(
        &self,
        leg: Leg,
        sender: Address,
        shares: u128,
        receiver: Address,
        owner: Address,
    ) -> Result<u128, NodeError> {
        self.call(|reply| Request::Redeem {
            leg,
            sender,
            shares,
            receiver,
            owner,
            reply,
        })
        .await
    }

    pub async fn transfer(&self, leg: Leg, sender: Address, to: Address, amount: u128) -> Result<(), NodeError> {
        self.call(|reply| Request::Transfer {
            leg,
            sender,
            to,
            amount,
            reply,
        })
        .await
    }

    /// Transfer with an opaque payload for the recipient.
    pub async fn send(
        &self,
        leg: Leg,
        sender: Address,
        to: Address,
        amount: u128,
        data: Vec<u8>,
    ) -> Result<(), NodeError> {
        self.call(|reply| Request::Send {
            leg,
            sender,
            to,
            amount,
            data,
            reply,
        })
        .await
    }

    /// Redeem pairs held by `from` on behalf of the configured wrapper.
    pub async fn burn(&self, leg: Leg, sender: Address, from: Address, amount: u128) -> Result<u128, NodeError> {
        self.call(|reply| Request::Burn {
            leg,
            sender,
            from,
            amount,
            reply,
        })
        .await
    }

    pub async fn transfer_from(
        &self,
        leg: Leg,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), NodeError> {
        self.call(|reply| Request::TransferFrom {
            leg,
            spender,
            from,
            to,
            amount,
            reply,
        })
        .await
    }

    pub async fn approve(&self, leg: Leg, owner: Address, spender: Address, amount: u128) -> Result<(), NodeError> {
        self.call(|reply| Request::Approve {
            leg,
            owner,
            spender,
            amount,
            reply,
        })
        .await
    }

    pub async fn rebase(&self, payload: Vec<u8>, signature: Signature) -> Result<RebaseDisposition, NodeError> {
        self.call(|reply| Request::Rebase {
            payload,
            signature,
            reply,
        })
        .await
    }

    pub async fn execute_scheduled_rebases(&self) -> Result<Vec<u64>, NodeError> {
        self.call(|reply| Request::ExecuteScheduledRebases { reply }).await
    }

    pub async fn balances(&self, holder: Address) -> Result<(u128, u128), NodeError> {
        self.call(|reply| Request::Balances { holder, reply }).await
    }

    pub async fn status(&self) -> Result<ProtocolStatus, NodeError> {
        self.call(|reply| Request::Status { reply }).await
    }

    pub async fn drain_events(&self) -> Result<(Vec<LedgerEvent>, Vec<SequencerEvent>), NodeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::DrainEvents { reply })
            .await
            .map_err(|_| NodeError::ServiceStopped)?;
        rx.await.map_err(|_| NodeError::ServiceStopped)
    }
}
