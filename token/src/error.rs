use thiserror::Error;
use tranche_ledger::LedgerError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrancheError {
    #[error("method not allowed: {0}")]
    MethodNotAllowed(&'static str),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
