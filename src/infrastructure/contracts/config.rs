use std::path::PathBuf;
use std::time::Duration;

use crate::domain::errors::ContractError;
use crate::infrastructure::contracts::types::{DeployerConfig, NativeCurrency, NetworkConfig, LOCAL_CHAIN_ID};

/// Network used when none is given, matching the Hardhat `defaultNetwork`.
pub const DEFAULT_NETWORK: &str = "base";

/// Etherscan multichain endpoint; the chain is selected with `chainid`.
pub const ETHERSCAN_V2_API_URL: &str = "https://api.etherscan.io/v2/api";

/// First account of the default Anvil / Hardhat mnemonic.
const ANVIL_DEFAULT_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Load the deployer configuration for `network` from the process environment.
pub fn load_config(network: &str) -> Result<DeployerConfig, ContractError> {
    load_config_with(network, |key| std::env::var(key).ok())
}

/// Load the deployer configuration reading variables through `var`.
pub fn load_config_with<F>(network: &str, var: F) -> Result<DeployerConfig, ContractError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut network = get_network_config(network, var("RPC_URL"))?;

    if let Some(chain_id) = var("CHAIN_ID") {
        network.chain_id = chain_id
            .parse::<u64>()
            .map_err(|e| ContractError::ConfigError(format!("Invalid CHAIN_ID {}: {}", chain_id, e)))?;
    }

    let private_key = get_private_key(&network, var("PRIVATE_KEY"));

    let confirmations = match var("CONFIRMATIONS") {
        Some(value) => value
            .parse::<usize>()
            .map_err(|e| ContractError::ConfigError(format!("Invalid CONFIRMATIONS {}: {}", value, e)))?,
        None => 1,
    };

    let confirmation_timeout = match var("CONFIRMATION_TIMEOUT_SECS") {
        Some(value) => Some(Duration::from_secs(value.parse::<u64>().map_err(|e| {
            ContractError::ConfigError(format!("Invalid CONFIRMATION_TIMEOUT_SECS {}: {}", value, e))
        })?)),
        None => None,
    };

    Ok(DeployerConfig {
        network,
        private_key,
        etherscan_api_key: var("ETHERSCAN_API_KEY").filter(|key| !key.is_empty()),
        confirmations,
        confirmation_timeout,
        artifacts_dir: PathBuf::from(var("ARTIFACTS_DIR").unwrap_or_else(|| "artifacts".to_string())),
        deployments_dir: PathBuf::from(var("DEPLOYMENTS_DIR").unwrap_or_else(|| "deployments".to_string())),
    })
}

/// Get network configuration by name. `rpc_url` overrides the public endpoint.
pub fn get_network_config(name: &str, rpc_url: Option<String>) -> Result<NetworkConfig, ContractError> {
    let mut config = match name {
        "base" => get_base_config(),
        "base_sepolia" | "base-sepolia" => get_base_sepolia_config(),
        "hardhat" | "anvil" | "localhost" => get_local_config(),
        _ => {
            return Err(ContractError::ConfigError(format!("Unsupported network: {}", name)));
        }
    };

    if let Some(url) = rpc_url.filter(|url| !url.is_empty()) {
        config.rpc_url = url;
    }

    Ok(config)
}

/// Base mainnet configuration
fn get_base_config() -> NetworkConfig {
    NetworkConfig {
        name: "base".to_string(),
        chain_id: 8453,
        rpc_url: "https://mainnet.base.org".to_string(),
        explorer_url: "https://basescan.org".to_string(),
        explorer_api_url: ETHERSCAN_V2_API_URL.to_string(),
        native_currency: ether(),
        block_time_seconds: 2,
    }
}

/// Base Sepolia testnet configuration
fn get_base_sepolia_config() -> NetworkConfig {
    NetworkConfig {
        name: "base_sepolia".to_string(),
        chain_id: 84532,
        rpc_url: "https://sepolia.base.org".to_string(),
        explorer_url: "https://sepolia.basescan.org".to_string(),
        explorer_api_url: ETHERSCAN_V2_API_URL.to_string(),
        native_currency: ether(),
        block_time_seconds: 2,
    }
}

/// Local Hardhat / Anvil node
fn get_local_config() -> NetworkConfig {
    NetworkConfig {
        name: "hardhat".to_string(),
        chain_id: LOCAL_CHAIN_ID,
        rpc_url: "http://localhost:8545".to_string(),
        explorer_url: "".to_string(),
        explorer_api_url: "".to_string(),
        native_currency: ether(),
        block_time_seconds: 1,
    }
}

fn ether() -> NativeCurrency {
    NativeCurrency {
        symbol: "ETH".to_string(),
        decimals: 18,
    }
}

/// Get private key with fallback for local nodes
fn get_private_key(network: &NetworkConfig, private_key: Option<String>) -> Option<String> {
    match private_key.filter(|key| !key.is_empty()) {
        Some(key) => Some(key),
        None if network.is_local() => Some(ANVIL_DEFAULT_PRIVATE_KEY.to_string()),
        None => None,
    }
}
