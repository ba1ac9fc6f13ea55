//! Protocol parameters fixed at ledger creation.
//!
//! Fee rate and enablement are the starting values only; the ledger owner
//! can change them afterwards without recomputing past intervals.

use crate::error::TypesError;
use serde::{Deserialize, Serialize};

/// Rolling-window cap on deposited underlying.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitParams {
    /// Length of the rolling window in seconds.
    pub window_secs: u64,
    /// Maximum underlying (raw units) that may be deposited within one window.
    #[serde(with = "crate::amount")]
    pub max_amount: u128,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParams {
    // ── Rebase schedule ──────────────────────────────────────────────────
    /// Minimum spacing between natural rebases, in seconds.
    #[serde(default = "default_rebase_interval")]
    pub rebase_interval_secs: u64,

    /// Upper bound on rebases applied by one call (direct + cascade).
    #[serde(default = "default_max_rebases_per_call")]
    pub max_rebases_per_call: usize,

    /// Maximum number of out-of-order rebases held in the queue.
    #[serde(default = "default_max_scheduled")]
    pub max_scheduled_rebases: usize,

    // ── Management fee ───────────────────────────────────────────────────
    /// Daily management fee in basis points of principal.
    #[serde(default, with = "crate::amount")]
    pub management_fee_rate_bps_per_day: u128,

    #[serde(default)]
    pub management_fees_enabled: bool,

    // ── Gates ────────────────────────────────────────────────────────────
    /// Deposit rate limit; `None` disables the limit.
    #[serde(default)]
    pub deposit_rate_limit: Option<RateLimitParams>,
}

fn default_rebase_interval() -> u64 {
    ProtocolParams::SECONDS_PER_DAY
}

fn default_max_rebases_per_call() -> usize {
    5
}

fn default_max_scheduled() -> usize {
    256
}

impl ProtocolParams {
    pub const SECONDS_PER_DAY: u64 = 86_400;

    /// Basis-point denominator for fee rates.
    pub const FEE_DENOMINATOR: u128 = 10_000;

    /// Reject parameter sets the ledger cannot operate with.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.rebase_interval_secs == 0 {
            return Err(TypesError::InvalidParams(
                "rebase_interval_secs must be non-zero".into(),
            ));
        }
        if self.max_rebases_per_call == 0 {
            return Err(TypesError::InvalidParams(
                "max_rebases_per_call must be non-zero".into(),
            ));
        }
        if self.management_fee_rate_bps_per_day >= Self::FEE_DENOMINATOR {
            return Err(TypesError::InvalidParams(format!(
                "management fee of {} bps/day consumes the whole principal",
                self.management_fee_rate_bps_per_day
            )));
        }
        if let Some(limit) = self.deposit_rate_limit {
            if limit.window_secs == 0 {
                return Err(TypesError::InvalidParams(
                    "deposit rate-limit window must be non-zero".into(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            rebase_interval_secs: default_rebase_interval(),
            max_rebases_per_call: default_max_rebases_per_call(),
            max_scheduled_rebases: default_max_scheduled(),
            management_fee_rate_bps_per_day: 0,
            management_fees_enabled: false,
            deposit_rate_limit: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = ProtocolParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.rebase_interval_secs, 86_400);
        assert_eq!(params.max_rebases_per_call, 5);
    }

    #[test]
    fn zero_interval_rejected() {
        let params = ProtocolParams {
            rebase_interval_secs: 0,
            ..ProtocolParams::default()
        };
        assert!(matches!(params.validate(), Err(TypesError::InvalidParams(_))));
    }

    #[test]
    fn confiscatory_fee_rejected() {
        let params = ProtocolParams {
            management_fee_rate_bps_per_day: 10_000,
            ..ProtocolParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn zero_rate_limit_window_rejected() {
        let params = ProtocolParams {
            deposit_rate_limit: Some(RateLimitParams {
                window_secs: 0,
                max_amount: 1,
            }),
            ..ProtocolParams::default()
        };
        assert!(params.validate().is_err());
    }
}
