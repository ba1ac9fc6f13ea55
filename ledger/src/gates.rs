//! Gates the ledger consults before moving value: circuit breakers, the
//! rolling deposit rate limit and an external sanctions list.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tranche_types::{Address, RateLimitParams, Timestamp};

use crate::error::LedgerError;

/// An operation class that can be halted independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gate {
    Deposit,
    Withdraw,
    Transfer,
    Rebase,
}

impl Gate {
    pub const ALL: [Gate; 4] = [Gate::Deposit, Gate::Withdraw, Gate::Transfer, Gate::Rebase];
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Gate::Deposit => "deposit",
            Gate::Withdraw => "withdraw",
            Gate::Transfer => "transfer",
            Gate::Rebase => "rebase",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakers {
    deposit: bool,
    withdraw: bool,
    transfer: bool,
    rebase: bool,
}

impl CircuitBreakers {
    pub fn is_tripped(&self, gate: Gate) -> bool {
        match gate {
            Gate::Deposit => self.deposit,
            Gate::Withdraw => self.withdraw,
            Gate::Transfer => self.transfer,
            Gate::Rebase => self.rebase,
        }
    }

    pub fn set(&mut self, gate: Gate, tripped: bool) {
        let slot = match gate {
            Gate::Deposit => &mut self.deposit,
            Gate::Withdraw => &mut self.withdraw,
            Gate::Transfer => &mut self.transfer,
            Gate::Rebase => &mut self.rebase,
        };
        *slot = tripped;
    }

    pub fn check(&self, gate: Gate) -> Result<(), LedgerError> {
        if self.is_tripped(gate) {
            return Err(LedgerError::CircuitBreakerActive(gate));
        }
        Ok(())
    }
}

/// Rolling-window cap on deposited underlying.
///
/// `check` and `record` are separate so a deposit that fails after the
/// check leaves the window untouched.
#[derive(Clone, Debug)]
pub struct DepositRateLimit {
    params: RateLimitParams,
    window: VecDeque<(Timestamp, u128)>,
}

impl DepositRateLimit {
    pub fn new(params: RateLimitParams) -> Self {
        Self {
            params,
            window: VecDeque::new(),
        }
    }

    pub fn params(&self) -> RateLimitParams {
        self.params
    }

    /// Sum of deposits still inside the window at `now`.
    pub fn used(&self, now: Timestamp) -> u128 {
        self.window
            .iter()
            .filter(|(at, _)| !at.has_expired(self.params.window_secs, now))
            .map(|(_, amount)| *amount)
            .fold(0u128, u128::saturating_add)
    }

    pub fn remaining(&self, now: Timestamp) -> u128 {
        self.params.max_amount.saturating_sub(self.used(now))
    }

    pub fn check(&self, amount: u128, now: Timestamp) -> Result<(), LedgerError> {
        let remaining = self.remaining(now);
        if amount > remaining {
            return Err(LedgerError::RateLimitExceeded {
                requested: amount,
                remaining,
            });
        }
        Ok(())
    }

    pub fn record(&mut self, amount: u128, now: Timestamp) {
        let window_secs = self.params.window_secs;
        while let Some((at, _)) = self.window.front() {
            if at.has_expired(window_secs, now) {
                self.window.pop_front();
            } else {
                break;
            }
        }
        self.window.push_back((now, amount));
    }
}

/// External deny list.
pub trait SanctionsList: Send {
    fn is_sanctioned(&self, account: &Address) -> bool;
}

/// Everything the ledger consults, none of which it owns economically.
#[derive(Default)]
pub struct Gates {
    pub breakers: CircuitBreakers,
    pub deposit_limit: Option<DepositRateLimit>,
    pub sanctions: Option<Box<dyn SanctionsList>>,
}

impl Gates {
    pub fn new(limit: Option<RateLimitParams>) -> Self {
        Self {
            breakers: CircuitBreakers::default(),
            deposit_limit: limit.map(DepositRateLimit::new),
            sanctions: None,
        }
    }

    pub fn check_sanctions(&self, accounts: &[&Address]) -> Result<(), LedgerError> {
        let Some(list) = &self.sanctions else {
            return Ok(());
        };
        match accounts.iter().find(|a| list.is_sanctioned(a)) {
            Some(hit) => Err(LedgerError::Sanctioned((*hit).clone())),
            None => Ok(()),
        }
    }

    pub fn check_deposit_limit(&self, amount: u128, now: Timestamp) -> Result<(), LedgerError> {
        match &self.deposit_limit {
            Some(limit) => limit.check(amount, now),
            None => Ok(()),
        }
    }

    pub fn record_deposit(&mut self, amount: u128, now: Timestamp) {
        if let Some(limit) = &mut self.deposit_limit {
            limit.record(amount, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DenyOne(Address);

    impl SanctionsList for DenyOne {
        fn is_sanctioned(&self, account: &Address) -> bool {
            *account == self.0
        }
    }

    #[test]
    fn breakers_are_independent() {
        let mut breakers = CircuitBreakers::default();
        breakers.set(Gate::Withdraw, true);
        assert_eq!(
            breakers.check(Gate::Withdraw),
            Err(LedgerError::CircuitBreakerActive(Gate::Withdraw))
        );
        for gate in [Gate::Deposit, Gate::Transfer, Gate::Rebase] {
            assert!(breakers.check(gate).is_ok());
        }
        breakers.set(Gate::Withdraw, false);
        assert!(breakers.check(Gate::Withdraw).is_ok());
    }

    #[test]
    fn rate_limit_rolls_over() {
        let mut limit = DepositRateLimit::new(RateLimitParams {
            window_secs: 100,
            max_amount: 1_000,
        });
        limit.record(600, Timestamp::new(10));
        assert!(limit.check(400, Timestamp::new(50)).is_ok());
        assert_eq!(
            limit.check(401, Timestamp::new(50)),
            Err(LedgerError::RateLimitExceeded {
                requested: 401,
                remaining: 400
            })
        );
        // The first deposit leaves the window at t = 110.
        assert!(limit.check(1_000, Timestamp::new(110)).is_ok());
    }

    #[test]
    fn record_prunes_expired_entries() {
        let mut limit = DepositRateLimit::new(RateLimitParams {
            window_secs: 10,
            max_amount: 100,
        });
        limit.record(50, Timestamp::new(0));
        limit.record(50, Timestamp::new(20));
        assert_eq!(limit.window.len(), 1);
        assert_eq!(limit.used(Timestamp::new(20)), 50);
    }

    #[test]
    fn sanctions_reject_listed_accounts() {
        let bad = Address::new("mallory");
        let mut gates = Gates::new(None);
        assert!(gates.check_sanctions(&[&bad]).is_ok());
        gates.sanctions = Some(Box::new(DenyOne(bad.clone())));
        let ok = Address::new("alice");
        assert!(gates.check_sanctions(&[&ok]).is_ok());
        assert_eq!(
            gates.check_sanctions(&[&ok, &bad]),
            Err(LedgerError::Sanctioned(bad))
        );
    }
}
