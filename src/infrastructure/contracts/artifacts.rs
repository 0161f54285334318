use std::fs;
use std::path::{Path, PathBuf};

use ethers::abi::Abi;
use ethers::types::Bytes;
use serde::Deserialize;
use tracing::debug;

use crate::domain::errors::ContractError;
use crate::domain::models::Artifact;
use crate::domain::services::ArtifactProvider;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifact {
    contract_name: String,
    source_name: String,
    abi: Abi,
    bytecode: Bytes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatDebugFile {
    build_info: String,
}

/// Compiler input and version a contract was built with.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub solc_long_version: String,
    /// Standard JSON input, as handed to solc.
    pub input: serde_json::Value,
}

/// Reads Hardhat compilation output:
/// `<root>/contracts/<Name>.sol/<Name>.json`.
#[derive(Debug, Clone)]
pub struct HardhatArtifacts {
    root: PathBuf,
}

impl HardhatArtifacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn contract_dir(&self, name: &str) -> PathBuf {
        self.root.join("contracts").join(format!("{}.sol", name))
    }

    /// Build info referenced by the contract's `.dbg.json` file.
    pub fn build_info(&self, name: &str) -> Result<BuildInfo, ContractError> {
        let dir = self.contract_dir(name);
        let debug_file: HardhatDebugFile = read_json(&dir.join(format!("{}.dbg.json", name)))?;
        read_json(&dir.join(debug_file.build_info))
    }
}

impl ArtifactProvider for HardhatArtifacts {
    fn get(&self, name: &str) -> Result<Artifact, ContractError> {
        let path = self.contract_dir(name).join(format!("{}.json", name));
        debug!("Loading artifact {} from {}", name, path.display());

        let artifact: HardhatArtifact = read_json(&path)?;

        if artifact.bytecode.is_empty() {
            return Err(ContractError::ArtifactError(format!(
                "{} has no creation bytecode (abstract contract or interface?)",
                name
            )));
        }

        Ok(Artifact {
            name: artifact.contract_name,
            source_name: artifact.source_name,
            abi: artifact.abi,
            bytecode: artifact.bytecode,
        })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ContractError> {
    let content = fs::read_to_string(path).map_err(|e| {
        ContractError::ArtifactError(format!("Failed to read {}: {}", path.display(), e))
    })?;

    serde_json::from_str(&content).map_err(|e| {
        ContractError::ArtifactError(format!("Failed to parse {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_contract(root: &Path, name: &str, bytecode: &str) {
        let dir = root.join("contracts").join(format!("{}.sol", name));
        fs::create_dir_all(&dir).unwrap();
        let artifact = json!({
            "_format": "hh-sol-artifact-1",
            "contractName": name,
            "sourceName": format!("contracts/{}.sol", name),
            "abi": [{
                "type": "function",
                "name": "approve",
                "stateMutability": "nonpayable",
                "inputs": [
                    {"name": "spender", "type": "address", "internalType": "address"},
                    {"name": "value", "type": "uint256", "internalType": "uint256"}
                ],
                "outputs": [{"name": "", "type": "bool", "internalType": "bool"}]
            }],
            "bytecode": bytecode,
            "deployedBytecode": bytecode,
            "linkReferences": {},
            "deployedLinkReferences": {}
        });
        fs::write(dir.join(format!("{}.json", name)), artifact.to_string()).unwrap();
        fs::write(
            dir.join(format!("{}.dbg.json", name)),
            json!({"_format": "hh-sol-dbg-1", "buildInfo": "../../build-info/abc123.json"}).to_string(),
        )
        .unwrap();
    }

    #[test]
    fn test_loads_hardhat_artifact() {
        let root = tempfile::tempdir().unwrap();
        write_contract(root.path(), "QCToken", "0x6080604052");

        let artifact = HardhatArtifacts::new(root.path()).get("QCToken").unwrap();

        assert_eq!(artifact.name, "QCToken");
        assert_eq!(artifact.qualified_name(), "contracts/QCToken.sol:QCToken");
        assert_eq!(artifact.bytecode.to_vec(), vec![0x60, 0x80, 0x60, 0x40, 0x52]);
        assert!(artifact.abi.function("approve").is_ok());
    }

    #[test]
    fn test_rejects_missing_and_empty_artifacts() {
        let root = tempfile::tempdir().unwrap();
        write_contract(root.path(), "IQuiz", "0x");
        let artifacts = HardhatArtifacts::new(root.path());

        assert!(matches!(artifacts.get("IQuiz"), Err(ContractError::ArtifactError(_))));
        assert!(matches!(artifacts.get("Missing"), Err(ContractError::ArtifactError(_))));
    }

    #[test]
    fn test_resolves_build_info_through_debug_file() {
        let root = tempfile::tempdir().unwrap();
        write_contract(root.path(), "QCToken", "0x6080604052");
        let build_info_dir = root.path().join("build-info");
        fs::create_dir_all(&build_info_dir).unwrap();
        fs::write(
            build_info_dir.join("abc123.json"),
            json!({
                "_format": "hh-sol-build-info-1",
                "solcVersion": "0.8.24",
                "solcLongVersion": "0.8.24+commit.e11b9ed9",
                "input": {"language": "Solidity", "sources": {}, "settings": {}},
                "output": {}
            })
            .to_string(),
        )
        .unwrap();

        let build_info = HardhatArtifacts::new(root.path()).build_info("QCToken").unwrap();

        assert_eq!(build_info.solc_long_version, "0.8.24+commit.e11b9ed9");
        assert_eq!(build_info.input["language"], "Solidity");
    }
}
