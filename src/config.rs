//! Node-side settings consumed by the lifecycle core.

use crate::constants::protocol::PROTOCOL_VERSION;
use crate::types::NetworkType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default = "default_network")]
    pub network: String,
    #[serde(default = "default_protocol_version")]
    pub protocol_version: u32,
    #[serde(default)]
    pub masternode: MasternodeConfig,
}

/// Local operator settings; only meaningful when `enabled` is set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MasternodeConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Advertised endpoint, e.g. "93.184.216.34:24100"
    #[serde(default)]
    pub service: String,
    /// Hex seed of the masternode key
    #[serde(default)]
    pub secret: String,
    /// Payout address
    #[serde(default)]
    pub payee: String,
}

fn default_network() -> String {
    "testnet".to_string()
}

fn default_protocol_version() -> u32 {
    PROTOCOL_VERSION
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            protocol_version: default_protocol_version(),
            masternode: MasternodeConfig::default(),
        }
    }
}

impl CoreConfig {
    pub fn network_type(&self) -> NetworkType {
        match self.network.to_lowercase().as_str() {
            "mainnet" => NetworkType::Mainnet,
            "regtest" => NetworkType::Regtest,
            _ => NetworkType::Testnet,
        }
    }
}
