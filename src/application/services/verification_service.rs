use tracing::{error, info};

use crate::domain::errors::ContractError;
use crate::domain::services::ArtifactProvider;
use crate::infrastructure::contracts::artifacts::HardhatArtifacts;
use crate::infrastructure::contracts::types::{DeploymentRecord, VerificationStatus};
use crate::infrastructure::contracts::utils::verification::{SourceVerifier, VerificationRequest};

/// Build the explorer request for one recorded contract.
pub fn build_request(
    artifacts: &HardhatArtifacts,
    record: &DeploymentRecord,
    name: &str,
) -> Result<VerificationRequest, ContractError> {
    let contract = record.contracts.get(name).ok_or_else(|| {
        ContractError::VerificationError(format!("{} not found in deployment record", name))
    })?;
    let artifact = artifacts.get(name)?;
    let build_info = artifacts.build_info(name)?;

    Ok(VerificationRequest {
        address: contract.address,
        contract_name: artifact.qualified_name(),
        compiler_version: build_info.solc_long_version,
        source: build_info.input,
        constructor_args: contract.constructor_args.clone(),
    })
}

/// Verify every contract in the record, one after another.
///
/// Independent of deployment: a failure here only fails this command. All
/// contracts are attempted; the first error is returned at the end. A
/// contract the verifier could not settle counts as an error.
pub async fn verify_deployment<V>(
    verifier: &V,
    artifacts: &HardhatArtifacts,
    record: &DeploymentRecord,
) -> Result<Vec<(String, VerificationStatus)>, ContractError>
where
    V: SourceVerifier + ?Sized,
{
    if record.chain_id != verifier.chain_id() {
        return Err(ContractError::VerificationError(format!(
            "Deployment record is for {} (chain {}), verifier targets chain {}",
            record.network,
            record.chain_id,
            verifier.chain_id()
        )));
    }

    info!("Verifying {} contracts on {}...", record.contracts.len(), record.network);

    let mut statuses = Vec::new();
    let mut first_error = None;

    for name in record.contracts.keys() {
        let outcome = match build_request(artifacts, record, name) {
            Ok(request) => verifier.verify(&request).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(status @ (VerificationStatus::Failed(_) | VerificationStatus::Pending)) => {
                error!("{} verification failed: {:?}", name, status);
                first_error.get_or_insert(ContractError::VerificationError(format!("{}: {:?}", name, status)));
                statuses.push((name.clone(), status));
            }
            Ok(status) => {
                info!("{}: {:?}", name, status);
                statuses.push((name.clone(), status));
            }
            Err(e) => {
                error!("{} verification failed: {}", name, e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(statuses),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::contracts::types::RecordedContract;
    use async_trait::async_trait;
    use ethers::types::{Address, Bytes, H256};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;

    fn write_artifact(root: &Path, name: &str) {
        let dir = root.join("contracts").join(format!("{}.sol", name));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(format!("{}.json", name)),
            json!({
                "contractName": name,
                "sourceName": format!("contracts/{}.sol", name),
                "abi": [],
                "bytecode": "0x6080"
            })
            .to_string(),
        )
        .unwrap();
        fs::write(
            dir.join(format!("{}.dbg.json", name)),
            json!({"buildInfo": "../../build-info/f00.json"}).to_string(),
        )
        .unwrap();
        fs::create_dir_all(root.join("build-info")).unwrap();
        fs::write(
            root.join("build-info").join("f00.json"),
            json!({
                "solcLongVersion": "0.8.24+commit.e11b9ed9",
                "input": {"language": "Solidity"}
            })
            .to_string(),
        )
        .unwrap();
    }

    fn record(chain_id: u64, names: &[&str]) -> DeploymentRecord {
        let contracts = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                (
                    name.to_string(),
                    RecordedContract {
                        address: Address::from_low_u64_be(7 + i as u64),
                        transaction_hash: H256::zero(),
                        block_number: 1,
                        constructor_args: Bytes::from(vec![1, 2, 3]),
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();

        DeploymentRecord {
            network: "base".to_string(),
            chain_id,
            deployer: Address::zero(),
            contracts,
        }
    }

    /// Answers with a fixed status per contract and remembers what it saw.
    struct ScriptedVerifier {
        chain_id: u64,
        statuses: BTreeMap<String, VerificationStatus>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedVerifier {
        fn new(chain_id: u64, statuses: &[(&str, VerificationStatus)]) -> Self {
            Self {
                chain_id,
                statuses: statuses.iter().map(|(n, s)| (n.to_string(), s.clone())).collect(),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SourceVerifier for ScriptedVerifier {
        fn chain_id(&self) -> u64 {
            self.chain_id
        }

        async fn verify(&self, request: &VerificationRequest) -> Result<VerificationStatus, ContractError> {
            let name = request
                .contract_name
                .rsplit(':')
                .next()
                .unwrap_or_default()
                .to_string();
            self.seen.lock().unwrap().push(name.clone());
            self.statuses
                .get(&name)
                .cloned()
                .ok_or_else(|| ContractError::TransportError(format!("no answer for {}", name)))
        }
    }

    #[test]
    fn test_build_request_uses_record_and_build_info() {
        let root = tempfile::tempdir().unwrap();
        write_artifact(root.path(), "QuizChainChallenge");
        let record = record(8453, &["QuizChainChallenge"]);

        let artifacts = HardhatArtifacts::new(root.path());
        let request = build_request(&artifacts, &record, "QuizChainChallenge").unwrap();

        assert_eq!(request.address, Address::from_low_u64_be(7));
        assert_eq!(request.contract_name, "contracts/QuizChainChallenge.sol:QuizChainChallenge");
        assert_eq!(request.compiler_version, "0.8.24+commit.e11b9ed9");
        assert_eq!(request.constructor_args.to_vec(), vec![1, 2, 3]);

        assert!(matches!(
            build_request(&artifacts, &record, "QCToken"),
            Err(ContractError::VerificationError(_))
        ));
    }

    #[tokio::test]
    async fn test_verifies_every_contract() {
        let root = tempfile::tempdir().unwrap();
        write_artifact(root.path(), "QCToken");
        write_artifact(root.path(), "QuizChainChallenge");
        let verifier = ScriptedVerifier::new(
            8453,
            &[
                ("QCToken", VerificationStatus::AlreadyVerified),
                ("QuizChainChallenge", VerificationStatus::Verified),
            ],
        );

        let statuses = verify_deployment(
            &verifier,
            &HardhatArtifacts::new(root.path()),
            &record(8453, &["QCToken", "QuizChainChallenge"]),
        )
        .await
        .unwrap();

        assert_eq!(
            statuses,
            vec![
                ("QCToken".to_string(), VerificationStatus::AlreadyVerified),
                ("QuizChainChallenge".to_string(), VerificationStatus::Verified),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_remaining_contracts() {
        let root = tempfile::tempdir().unwrap();
        write_artifact(root.path(), "QCToken");
        write_artifact(root.path(), "QuizChainChallenge");
        let verifier = ScriptedVerifier::new(
            8453,
            &[
                ("QCToken", VerificationStatus::Failed("Fail - Unable to verify".to_string())),
                ("QuizChainChallenge", VerificationStatus::Verified),
            ],
        );

        let err = verify_deployment(
            &verifier,
            &HardhatArtifacts::new(root.path()),
            &record(8453, &["QCToken", "QuizChainChallenge"]),
        )
        .await
        .unwrap_err();

        assert_eq!(verifier.seen(), vec!["QCToken", "QuizChainChallenge"]);
        assert!(matches!(err, ContractError::VerificationError(_)));
        assert!(err.to_string().contains("QCToken"));
    }

    #[tokio::test]
    async fn test_unsettled_verification_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        write_artifact(root.path(), "QCToken");
        let verifier = ScriptedVerifier::new(8453, &[("QCToken", VerificationStatus::Pending)]);

        let result = verify_deployment(
            &verifier,
            &HardhatArtifacts::new(root.path()),
            &record(8453, &["QCToken"]),
        )
        .await;

        assert!(matches!(result, Err(ContractError::VerificationError(_))));
    }

    #[tokio::test]
    async fn test_rejects_record_from_another_chain() {
        let root = tempfile::tempdir().unwrap();
        write_artifact(root.path(), "QCToken");
        let verifier = ScriptedVerifier::new(8453, &[("QCToken", VerificationStatus::Verified)]);

        let result = verify_deployment(
            &verifier,
            &HardhatArtifacts::new(root.path()),
            &record(84532, &["QCToken"]),
        )
        .await;

        assert!(matches!(result, Err(ContractError::VerificationError(_))));
        assert!(verifier.seen().is_empty());
    }
}
