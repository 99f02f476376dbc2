//! Runtime configuration.
//!
//! Built once at startup and passed into each component at construction.
//! Nothing here is ambient global state: a component sees exactly the config
//! value it was handed.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Devnet,
    Testnet,
}

impl Network {
    pub fn default_rpc(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://api.mainnet-beta.solana.com",
            Network::Devnet => "https://api.devnet.solana.com",
            Network::Testnet => "https://api.testnet.solana.com",
        }
    }
}

pub const DEFAULT_API_URL: &str = "https://www.mintyouragent.com/api";

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub network: Network,
    /// RPC endpoints in failover order. Always at least one.
    pub rpc_endpoints: Vec<String>,
    pub api_url: String,
    pub data_dir: PathBuf,
    pub default_slippage_bps: u16,
    pub rpc_timeout_secs: u64,
    pub rpc_retry_attempts: usize,
    pub rpc_rate_limit_rps: u32,
    pub confirm_timeout_secs: u64,
    pub skip_balance_check: bool,
    /// Short id correlating log lines and history rows of one process run.
    pub correlation_id: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let network = Network::Mainnet;
        Self {
            network,
            rpc_endpoints: vec![network.default_rpc().to_string()],
            api_url: DEFAULT_API_URL.to_string(),
            data_dir: default_data_dir(),
            default_slippage_bps: 500,
            rpc_timeout_secs: 10,
            rpc_retry_attempts: 3,
            rpc_rate_limit_rps: 10,
            confirm_timeout_secs: 30,
            skip_balance_check: false,
            correlation_id: short_correlation_id(),
        }
    }
}

impl RuntimeConfig {
    /// Defaults with environment overrides applied. A custom RPC endpoint is
    /// tried first, with the public endpoint kept as failover.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(network) = std::env::var("SOULMINT_NETWORK") {
            cfg.set_network(match network.as_str() {
                "devnet" => Network::Devnet,
                "testnet" => Network::Testnet,
                _ => Network::Mainnet,
            });
        }
        if let Some(url) = first_env(&["SOULMINT_RPC_URL", "HELIUS_RPC", "SOLANA_RPC_URL"]) {
            cfg.rpc_endpoints.insert(0, url);
        }
        if let Ok(url) = std::env::var("SOULMINT_API_URL") {
            cfg.api_url = url;
        }
        cfg
    }

    pub fn set_network(&mut self, network: Network) {
        self.network = network;
        self.rpc_endpoints = vec![network.default_rpc().to_string()];
    }

    pub fn wallet_file(&self) -> PathBuf {
        self.data_dir.join("wallet.json")
    }

    pub fn wallet_lock_file(&self) -> PathBuf {
        self.data_dir.join("wallet.lock")
    }

    pub fn recovery_file(&self) -> PathBuf {
        self.data_dir.join("RECOVERY_KEY.txt")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir.join("backups")
    }

    pub fn history_db(&self) -> PathBuf {
        self.data_dir.join("history.db")
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".soulmint")
}

fn short_correlation_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| std::env::var(k).ok().filter(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_mainnet_with_one_endpoint() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.network, Network::Mainnet);
        assert_eq!(cfg.rpc_endpoints.len(), 1);
        assert_eq!(cfg.correlation_id.len(), 8);
    }

    #[test]
    fn set_network_swaps_endpoints() {
        let mut cfg = RuntimeConfig::default();
        cfg.set_network(Network::Devnet);
        assert_eq!(cfg.rpc_endpoints, vec![Network::Devnet.default_rpc().to_string()]);
    }

    #[test]
    fn paths_live_under_the_data_dir() {
        let mut cfg = RuntimeConfig::default();
        cfg.data_dir = PathBuf::from("/tmp/soulmint-test");
        assert_eq!(cfg.wallet_file(), PathBuf::from("/tmp/soulmint-test/wallet.json"));
        assert_eq!(cfg.backup_dir(), PathBuf::from("/tmp/soulmint-test/backups"));
    }
}
