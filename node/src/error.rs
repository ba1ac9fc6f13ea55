use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] tranche_ledger::LedgerError),

    #[error("tranche error: {0}")]
    Tranche(#[from] tranche_token::TrancheError),

    #[error("sequencer error: {0}")]
    Sequencer(#[from] tranche_sequencer::SequencerError),

    #[error("invalid parameters: {0}")]
    Params(#[from] tranche_types::TypesError),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid rebase signer key: {0}")]
    InvalidSignerKey(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("protocol service has stopped")]
    ServiceStopped,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
