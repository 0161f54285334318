use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::format_units;
use serde::{Deserialize, Serialize};

use crate::domain::errors::ContractError;

// ============ CONFIGURATION TYPES ============

/// Chain id shared by Hardhat and Anvil dev nodes.
pub const LOCAL_CHAIN_ID: u64 = 31337;

/// Native currency information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeCurrency {
    pub symbol: String,
    pub decimals: u8,
}

impl NativeCurrency {
    /// Render a base-unit amount as e.g. `1.5 ETH`.
    pub fn format(&self, amount: U256) -> Result<String, ContractError> {
        let value = format_units(amount, u32::from(self.decimals))
            .map_err(|e| ContractError::ConfigError(format!("Cannot format {}: {}", self.symbol, e)))?;
        Ok(format!("{} {}", value, self.symbol))
    }
}

/// Network the deployer talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub explorer_url: String,
    pub explorer_api_url: String,
    pub native_currency: NativeCurrency,
    pub block_time_seconds: u64,
}

impl NetworkConfig {
    /// Dev node: selected by one of the local aliases or running the dev chain id.
    pub fn is_local(&self) -> bool {
        matches!(self.name.as_str(), "hardhat" | "anvil" | "localhost") || self.chain_id == LOCAL_CHAIN_ID
    }

    /// Explorer page for `address`, if the network has an explorer.
    pub fn explorer_address_url(&self, address: Address) -> Option<String> {
        if self.explorer_url.is_empty() {
            return None;
        }
        Some(format!("{}/address/{:?}", self.explorer_url.trim_end_matches('/'), address))
    }
}

/// Everything read from the environment at process start.
#[derive(Debug, Clone)]
pub struct DeployerConfig {
    pub network: NetworkConfig,
    /// `None` when no key is configured; only commands that sign need one.
    pub private_key: Option<String>,
    pub etherscan_api_key: Option<String>,
    /// Block confirmations required before a step counts as confirmed.
    pub confirmations: usize,
    /// `None` waits for confirmation without bound.
    pub confirmation_timeout: Option<Duration>,
    pub artifacts_dir: PathBuf,
    pub deployments_dir: PathBuf,
}

impl DeployerConfig {
    pub fn signing_key(&self) -> Result<&str, ContractError> {
        self.private_key.as_deref().ok_or_else(|| ContractError::InvalidSignature {
            reason: format!(
                "PRIVATE_KEY environment variable not set. Required for chain ID: {}",
                self.network.chain_id
            ),
        })
    }

    /// Path of this network's deployment record.
    pub fn deployment_file(&self) -> PathBuf {
        self.deployments_dir.join(format!("{}.json", self.network.name))
    }
}

// ============ DEPLOYMENT RECORD TYPES ============

/// One deployed contract as written to the deployment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedContract {
    pub address: Address,
    pub transaction_hash: H256,
    pub block_number: u64,
    /// ABI-encoded constructor arguments.
    pub constructor_args: Bytes,
}

/// Output of a successful `deploy` run, keyed by contract name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub network: String,
    pub chain_id: u64,
    pub deployer: Address,
    pub contracts: BTreeMap<String, RecordedContract>,
}

// ============ VERIFICATION TYPES ============

/// Outcome reported by the explorer for a verification submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Verified,
    AlreadyVerified,
    Pending,
    Failed(String),
}
