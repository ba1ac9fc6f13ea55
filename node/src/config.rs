//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;

use tranche_ledger::LedgerRoles;
use tranche_token::TrancheMetadata;
use tranche_types::{Address, ProtocolParams, PublicKey, Timestamp};

use crate::logging::LogFormat;
use crate::NodeError;

/// Addresses of the protocol's participants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolesConfig {
    #[serde(default = "default_ledger")]
    pub ledger: Address,
    #[serde(default = "default_owner")]
    pub owner: Address,
    #[serde(default = "default_sequencer")]
    pub sequencer: Address,
    #[serde(default = "default_tranche_x")]
    pub tranche_x: Address,
    #[serde(default = "default_tranche_y")]
    pub tranche_y: Address,
}

/// Configuration for a protocol host.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Start of the natural-rebase schedule. Defaults to the time the
    /// protocol is assembled.
    #[serde(default)]
    pub genesis_timestamp: Option<u64>,

    /// Hex-encoded Ed25519 public key of the rebase signer.
    #[serde(default)]
    pub rebase_signer: Option<String>,

    /// Capacity of the service's request queue.
    #[serde(default = "default_request_queue")]
    pub request_queue: usize,

    #[serde(default)]
    pub roles: RolesConfig,

    #[serde(default)]
    pub params: ProtocolParams,

    #[serde(default = "default_tranche_x_metadata")]
    pub tranche_x: TrancheMetadata,

    #[serde(default = "default_tranche_y_metadata")]
    pub tranche_y: TrancheMetadata,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_queue() -> usize {
    1_024
}

fn default_ledger() -> Address {
    Address::new("tranche-ledger")
}

fn default_owner() -> Address {
    Address::new("owner")
}

fn default_sequencer() -> Address {
    Address::new("sequencer")
}

fn default_tranche_x() -> Address {
    Address::new("tranche-x")
}

fn default_tranche_y() -> Address {
    Address::new("tranche-y")
}

fn default_tranche_x_metadata() -> TrancheMetadata {
    TrancheMetadata {
        name: "Tranche X".into(),
        symbol: "TRX".into(),
        decimals: 18,
    }
}

fn default_tranche_y_metadata() -> TrancheMetadata {
    TrancheMetadata {
        name: "Tranche Y".into(),
        symbol: "TRY".into(),
        decimals: 18,
    }
}

// ── Impl ───────────────────────────────────────────────────────────────

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            ledger: default_ledger(),
            owner: default_owner(),
            sequencer: default_sequencer(),
            tranche_x: default_tranche_x(),
            tranche_y: default_tranche_y(),
        }
    }
}

impl From<&RolesConfig> for LedgerRoles {
    fn from(roles: &RolesConfig) -> Self {
        LedgerRoles {
            ledger: roles.ledger.clone(),
            owner: roles.owner.clone(),
            sequencer: roles.sequencer.clone(),
            tranche_x: roles.tranche_x.clone(),
            tranche_y: roles.tranche_y.clone(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        self.params.validate()?;
        if self.request_queue == 0 {
            return Err(NodeError::Config("request_queue must be non-zero".into()));
        }
        let roles = [
            &self.roles.ledger,
            &self.roles.sequencer,
            &self.roles.tranche_x,
            &self.roles.tranche_y,
        ];
        for (i, a) in roles.iter().enumerate() {
            if !a.is_valid() {
                return Err(NodeError::Config(format!("invalid role address {a:?}")));
            }
            if roles[i + 1..].contains(a) {
                return Err(NodeError::Config(format!("role address {a} is used twice")));
            }
        }
        self.signer_key()?;
        Ok(())
    }

    /// The configured rebase signer, if any.
    pub fn signer_key(&self) -> Result<Option<PublicKey>, NodeError> {
        let Some(hex_key) = &self.rebase_signer else {
            return Ok(None);
        };
        let bytes = hex::decode(hex_key.trim_start_matches("0x"))
            .map_err(|e| NodeError::InvalidSignerKey(e.to_string()))?;
        PublicKey::from_slice(&bytes)
            .map(Some)
            .map_err(|e| NodeError::InvalidSignerKey(e.to_string()))
    }

    /// The configured genesis, or `now`.
    pub fn genesis(&self, now: Timestamp) -> Timestamp {
        self.genesis_timestamp.map(Timestamp::new).unwrap_or(now)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            genesis_timestamp: None,
            rebase_signer: None,
            request_queue: default_request_queue(),
            roles: RolesConfig::default(),
            params: ProtocolParams::default(),
            tranche_x: default_tranche_x_metadata(),
            tranche_y: default_tranche_y_metadata(),
        }
    }
}
