use thiserror::Error;
use tranche_math::MathError;
use tranche_types::{Address, Timestamp, TypesError};

use crate::asset::AssetError;
use crate::gates::Gate;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // ── Gates ────────────────────────────────────────────────────────────
    #[error("{0} circuit breaker is active")]
    CircuitBreakerActive(Gate),

    #[error("deposit rate limit exceeded: requested {requested}, {remaining} left in window")]
    RateLimitExceeded { requested: u128, remaining: u128 },

    #[error("address is sanctioned: {0}")]
    Sanctioned(Address),

    // ── Ordering ─────────────────────────────────────────────────────────
    #[error("rebase {sequence} already applied (current sequence {current})")]
    SequenceAlreadyApplied { sequence: u64, current: u64 },

    #[error("natural rebase {sequence} not allowed before {not_before}")]
    NaturalRebaseTooEarly { sequence: u64, not_before: Timestamp },

    #[error("rebase {0} is already scheduled")]
    AlreadyScheduled(u64),

    #[error("rebase queue is full ({capacity} entries)")]
    QueueFull { capacity: usize },

    #[error("checkpoint at sequence {sequence} predates holder writes")]
    CheckpointSuperseded { sequence: u64 },

    // ── Access ───────────────────────────────────────────────────────────
    #[error("caller is not a tranche of this ledger: {0}")]
    NotTranche(Address),

    #[error("caller is not the sequencer: {0}")]
    NotSequencer(Address),

    #[error("caller is not the ledger owner: {0}")]
    Unauthorized(Address),

    // ── Economic ─────────────────────────────────────────────────────────
    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("requested {requested} exceeds maximum {max}")]
    ExceedsMax { requested: u128, max: u128 },

    #[error("{spender} may not move shares owned by {owner}")]
    NotShareOwner { owner: Address, spender: Address },

    #[error("insufficient balance: {available} available, {requested} requested")]
    InsufficientBalance { available: u128, requested: u128 },

    #[error("insufficient allowance: {allowed} allowed, {requested} requested")]
    InsufficientAllowance { allowed: u128, requested: u128 },

    #[error("insufficient custody: {available} held, {requested} requested")]
    InsufficientCustody { available: u128, requested: u128 },

    #[error("reentrant call for {0}")]
    Reentrancy(Address),

    // ── Configuration ────────────────────────────────────────────────────
    #[error("invalid parameters: {0}")]
    InvalidParams(#[from] TypesError),

    #[error("management fee rate {0} bps/day is out of range")]
    InvalidFeeRate(u128),

    // ── Wrapped ──────────────────────────────────────────────────────────
    #[error("rebase math: {0}")]
    Math(#[from] MathError),

    #[error("underlying asset: {0}")]
    Asset(#[from] AssetError),
}
