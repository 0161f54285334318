use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ethers::types::Address;
use tracing::info;

use crate::domain::errors::ContractError;
use crate::domain::models::RunResult;
use crate::infrastructure::contracts::types::{DeploymentRecord, NetworkConfig, RecordedContract};

/// Build the deployment record for a successful run.
pub fn record_from_run(network: &NetworkConfig, deployer: Address, run: &RunResult) -> DeploymentRecord {
    let contracts = run
        .resources
        .iter()
        .map(|resource| {
            (
                resource.name.clone(),
                RecordedContract {
                    address: resource.address,
                    transaction_hash: resource.receipt.transaction_hash,
                    block_number: resource.receipt.block_number,
                    constructor_args: resource.constructor_args.clone(),
                },
            )
        })
        .collect::<BTreeMap<_, _>>();

    DeploymentRecord {
        network: network.name.clone(),
        chain_id: network.chain_id,
        deployer,
        contracts,
    }
}

/// Save deployed addresses as pretty JSON, creating parent directories.
pub fn save_deployment(path: &Path, record: &DeploymentRecord) -> Result<(), ContractError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ContractError::ArtifactError(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }

    let content = serde_json::to_string_pretty(record)
        .map_err(|e| ContractError::ArtifactError(format!("Failed to serialize deployment record: {}", e)))?;
    fs::write(path, content)
        .map_err(|e| ContractError::ArtifactError(format!("Failed to write {}: {}", path.display(), e)))?;

    info!("Deployment record saved to: {}", path.display());
    Ok(())
}

// Load a deployment record written by `save_deployment`
pub fn load_deployment(path: &Path) -> Result<DeploymentRecord, ContractError> {
    let content = fs::read_to_string(path).map_err(|e| {
        ContractError::ArtifactError(format!(
            "Failed to read deployment record {}: {}. Run deployment first.",
            path.display(),
            e
        ))
    })?;

    serde_json::from_str(&content).map_err(|e| {
        ContractError::ArtifactError(format!("Failed to parse deployment record {}: {}", path.display(), e))
    })
}
