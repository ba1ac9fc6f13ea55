//! Hosting surface for the two-tranche protocol.
//!
//! Wires the ledger, both tranche facades and the sequencer together into a
//! [`Protocol`], loads [`NodeConfig`] from TOML, initialises logging and
//! runs the protocol behind a single-writer tokio actor
//! ([`ProtocolService`]) so every mutating request is applied one at a
//! time, in arrival order.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod protocol;
pub mod service;

pub use config::{NodeConfig, RolesConfig};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::ProtocolMetrics;
pub use protocol::{Protocol, ProtocolStatus};
pub use service::{ProtocolHandle, ProtocolService, Request};
