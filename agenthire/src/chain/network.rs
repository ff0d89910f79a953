//! Target network identity and contract addresses, loaded from
//! `config/network.ron`.

use crate::error::{AppError, Result};
use ethers::providers::Middleware;
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Chain the demo runs on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDefinition {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub native_currency: NativeCurrency,
    #[serde(default)]
    pub explorer_url: Option<String>,
}

impl NetworkDefinition {
    pub fn chain_id_hex(&self) -> String {
        format!("0x{:x}", self.chain_id)
    }

    pub fn primary_rpc_url(&self) -> Result<&str> {
        self.rpc_urls
            .first()
            .map(|s| s.as_str())
            .ok_or_else(|| AppError::Config(format!("Network '{}' has no RPC URL", self.chain_name)))
    }

    /// Parameters for a browser wallet's `wallet_addEthereumChain` request
    pub fn add_chain_params(&self) -> serde_json::Value {
        let mut params = serde_json::json!({
            "chainId": self.chain_id_hex(),
            "chainName": self.chain_name,
            "rpcUrls": self.rpc_urls,
            "nativeCurrency": {
                "name": self.native_currency.name,
                "symbol": self.native_currency.symbol,
                "decimals": self.native_currency.decimals,
            },
        });
        if let Some(ref explorer) = self.explorer_url {
            params["blockExplorerUrls"] = serde_json::json!([explorer]);
        }
        params
    }

    /// Explorer link for a transaction hash
    pub fn explorer_tx_url(&self, tx_hash: &str) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub agent_token: Address,
    pub task_escrow: Address,
    pub agent_registry: Address,
}

/// USDC → AGENT bridge settings (optional)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub source_chain_id: u64,
    pub source_rpc_url: String,
    pub usdc_address: Address,
    #[serde(default = "default_usdc_decimals")]
    pub usdc_decimals: u8,
    /// Receiver of the bridged USDC on the source chain
    pub owner_address: Address,
    /// AGENT minted per whole USDC
    #[serde(default = "default_agent_per_usdc")]
    pub agent_per_usdc: u64,
}

fn default_usdc_decimals() -> u8 {
    6
}

fn default_agent_per_usdc() -> u64 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub network: NetworkDefinition,
    pub contracts: ContractAddresses,
    #[serde(default)]
    pub bridge: Option<BridgeConfig>,
}

impl NetworkConfig {
    /// Load `network.ron` from the config directory
    pub fn load(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join("network.ron");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| AppError::Config(format!("Failed to read {:?}: {}", path, e)))?;
        let config: NetworkConfig = ron::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse {:?}: {}", path, e)))?;

        log::info!(
            "[network] Loaded {} (chain {}) from {:?}",
            config.network.chain_name,
            config.network.chain_id,
            path
        );
        Ok(config)
    }
}

/// Verify the RPC endpoint serves the expected chain
pub async fn ensure_network<M: Middleware>(provider: &M, expected: u64) -> Result<()> {
    let actual = provider
        .get_chainid()
        .await
        .map_err(|e| AppError::Chain(format!("eth_chainId failed: {}", e)))?;

    if actual.bits() > 64 || actual.as_u64() != expected {
        return Err(AppError::WrongNetwork {
            expected,
            actual: actual.low_u64(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"(
        network: (
            chain_id: 324705682,
            chain_name: "SKALE on Base Testnet",
            rpc_urls: ["https://base-sepolia-testnet.skalenodes.com/v1/base-testnet"],
            native_currency: (name: "CREDIT", symbol: "CREDIT", decimals: 18),
            explorer_url: Some("https://base-sepolia-testnet-explorer.skalenodes.com/"),
        ),
        contracts: (
            agent_token: "0xEC307d7ae333C32b70889F0Fd61ce6f02Ee31Cf8",
            task_escrow: "0x29B8dB70779839AdD01c87bEC59475aBB8e94E62",
            agent_registry: "0x5dB6615Be918c7d12c1342C7580BeA4a7726d6b1",
        ),
    )"#;

    #[test]
    fn test_load_network_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("network.ron"), SAMPLE).unwrap();

        let config = NetworkConfig::load(dir.path()).unwrap();
        assert_eq!(config.network.chain_id, 324705682);
        assert_eq!(config.network.chain_id_hex(), "0x135a9d92");
        assert!(config.bridge.is_none());
        assert_eq!(
            format!("{:?}", config.contracts.task_escrow),
            "0x29b8db70779839add01c87bec59475abb8e94e62"
        );
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = NetworkConfig::load(dir.path()).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_add_chain_params_and_explorer_link() {
        let config: NetworkConfig = ron::from_str(SAMPLE).unwrap();
        let params = config.network.add_chain_params();
        assert_eq!(params["chainId"], "0x135a9d92");
        assert_eq!(params["nativeCurrency"]["symbol"], "CREDIT");
        assert_eq!(params["blockExplorerUrls"][0], "https://base-sepolia-testnet-explorer.skalenodes.com/");

        assert_eq!(
            config.network.explorer_tx_url("0xabc").unwrap(),
            "https://base-sepolia-testnet-explorer.skalenodes.com/tx/0xabc"
        );
    }
}
