use std::time::Duration;

use async_trait::async_trait;
use ethers::types::{Address, Bytes};
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::domain::errors::ContractError;
use crate::infrastructure::contracts::types::{NetworkConfig, VerificationStatus};

#[derive(Debug, Deserialize)]
pub struct EtherscanResponse {
    pub status: String,
    pub message: String,
    pub result: serde_json::Value,
}

impl EtherscanResponse {
    fn result_text(&self) -> String {
        match &self.result {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// What the explorer said to a new verification submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Accepted; poll the status with this GUID.
    Queued(String),
    AlreadyVerified,
}

/// Everything the explorer needs to match bytecode against source.
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub address: Address,
    /// `path/To.sol:Contract`
    pub contract_name: String,
    /// solc long version without the leading `v`, e.g. `0.8.24+commit.e11b9ed9`.
    pub compiler_version: String,
    /// Standard JSON input
    pub source: serde_json::Value,
    /// ABI-encoded constructor arguments.
    pub constructor_args: Bytes,
}

/// Anything that can check deployed bytecode against its source.
#[async_trait]
pub trait SourceVerifier: Send + Sync {
    /// Chain the verifier submits to.
    fn chain_id(&self) -> u64;

    /// Submit source for `request` and wait until the verifier settles.
    async fn verify(&self, request: &VerificationRequest) -> Result<VerificationStatus, ContractError>;
}

/// Client for the Etherscan contract verification API.
#[derive(Clone)]
pub struct EtherscanVerifier {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    chain_id: u64,
    poll_interval: Duration,
    max_polls: usize,
}

impl EtherscanVerifier {
    pub fn new(network: &NetworkConfig, api_key: Option<&str>) -> Result<Self, ContractError> {
        if network.is_local() || network.explorer_api_url.is_empty() {
            return Err(ContractError::VerificationError(format!(
                "Network {} has no block explorer to verify against",
                network.name
            )));
        }

        let api_key = api_key.ok_or_else(|| {
            ContractError::ConfigError("ETHERSCAN_API_KEY environment variable not set".to_string())
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ContractError::VerificationError(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            client,
            api_url: network.explorer_api_url.clone(),
            api_key: api_key.to_string(),
            chain_id: network.chain_id,
            poll_interval: Duration::from_secs(5),
            max_polls: 24,
        })
    }

    async fn submit(&self, request: &VerificationRequest) -> Result<SubmitOutcome, ContractError> {
        let source = serde_json::to_string(&request.source)
            .map_err(|e| ContractError::VerificationError(format!("Failed to serialize source: {}", e)))?;

        let form = [
            ("apikey", self.api_key.clone()),
            ("module", "contract".to_string()),
            ("action", "verifysourcecode".to_string()),
            ("contractaddress", format!("{:?}", request.address)),
            ("sourceCode", source),
            ("codeformat", "solidity-standard-json-input".to_string()),
            ("contractname", request.contract_name.clone()),
            ("compilerversion", format!("v{}", request.compiler_version)),
            // Etherscan's own spelling
            ("constructorArguements", hex::encode(&request.constructor_args)),
        ];

        let response = self
            .client
            .post(&self.api_url)
            .query(&[("chainid", self.chain_id.to_string())])
            .form(&form)
            .send()
            .await
            .map_err(|e| ContractError::TransportError(format!("Failed to reach explorer: {}", e)))?;

        let body: EtherscanResponse = response
            .json()
            .await
            .map_err(|e| ContractError::VerificationError(format!("Failed to parse explorer response: {}", e)))?;

        interpret_submission(&body)
    }

    async fn check_status(&self, guid: &str) -> Result<VerificationStatus, ContractError> {
        let query = [
            ("chainid", self.chain_id.to_string()),
            ("apikey", self.api_key.clone()),
            ("module", "contract".to_string()),
            ("action", "checkverifystatus".to_string()),
            ("guid", guid.to_string()),
        ];

        let body: EtherscanResponse = self
            .client
            .get(&self.api_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ContractError::TransportError(format!("Failed to reach explorer: {}", e)))?
            .json()
            .await
            .map_err(|e| ContractError::VerificationError(format!("Failed to parse explorer response: {}", e)))?;

        Ok(interpret_status(&body))
    }
}

#[async_trait]
impl SourceVerifier for EtherscanVerifier {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn verify(&self, request: &VerificationRequest) -> Result<VerificationStatus, ContractError> {
        info!("Verifying {} at {:?}", request.contract_name, request.address);

        let guid = match self.submit(request).await? {
            SubmitOutcome::Queued(guid) => guid,
            SubmitOutcome::AlreadyVerified => {
                info!("{} is already verified", request.contract_name);
                return Ok(VerificationStatus::AlreadyVerified);
            }
        };

        for attempt in 1..=self.max_polls {
            sleep(self.poll_interval).await;

            let status = self.check_status(&guid).await?;
            debug!("Verification {} poll {}: {:?}", guid, attempt, status);

            if status != VerificationStatus::Pending {
                return Ok(status);
            }
        }

        warn!("Verification {} still pending after {} polls", guid, self.max_polls);
        Err(ContractError::VerificationError(format!(
            "{} still pending after {} polls (guid {})",
            request.contract_name, self.max_polls, guid
        )))
    }
}

fn is_already_verified(text: &str) -> bool {
    text.to_lowercase().contains("already verified")
}

pub fn interpret_submission(body: &EtherscanResponse) -> Result<SubmitOutcome, ContractError> {
    let result = body.result_text();

    if body.status == "1" {
        return Ok(SubmitOutcome::Queued(result));
    }
    if is_already_verified(&result) {
        return Ok(SubmitOutcome::AlreadyVerified);
    }

    Err(ContractError::VerificationError(format!("{}: {}", body.message, result)))
}

pub fn interpret_status(body: &EtherscanResponse) -> VerificationStatus {
    let result = body.result_text();

    if body.status == "1" {
        return VerificationStatus::Verified;
    }
    if result.contains("Pending in queue") {
        return VerificationStatus::Pending;
    }
    if is_already_verified(&result) {
        return VerificationStatus::AlreadyVerified;
    }

    VerificationStatus::Failed(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::contracts::config::get_network_config;
    use serde_json::json;

    fn response(value: serde_json::Value) -> EtherscanResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_submission_queued_returns_guid() {
        let body = response(json!({
            "status": "1",
            "message": "OK",
            "result": "ezq878u486pzijkvvmerl6a9mzwhv6sefgvqi5tkwceejc7tvn"
        }));

        assert_eq!(
            interpret_submission(&body).unwrap(),
            SubmitOutcome::Queued("ezq878u486pzijkvvmerl6a9mzwhv6sefgvqi5tkwceejc7tvn".to_string())
        );
    }

    #[test]
    fn test_submission_already_verified_is_not_an_error() {
        let body = response(json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Contract source code already verified"
        }));

        assert_eq!(interpret_submission(&body).unwrap(), SubmitOutcome::AlreadyVerified);
    }

    #[test]
    fn test_submission_rejection_is_an_error() {
        let body = response(json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Invalid API Key"
        }));

        let err = interpret_submission(&body).unwrap_err();
        assert!(err.to_string().contains("Invalid API Key"));
    }

    #[test]
    fn test_status_interpretation() {
        let pass = response(json!({"status": "1", "message": "OK", "result": "Pass - Verified"}));
        let pending = response(json!({"status": "0", "message": "NOTOK", "result": "Pending in queue"}));
        let already = response(json!({"status": "0", "message": "NOTOK", "result": "Already Verified"}));
        let fail = response(json!({"status": "0", "message": "NOTOK", "result": "Fail - Unable to verify"}));

        assert_eq!(interpret_status(&pass), VerificationStatus::Verified);
        assert_eq!(interpret_status(&pending), VerificationStatus::Pending);
        assert_eq!(interpret_status(&already), VerificationStatus::AlreadyVerified);
        assert_eq!(
            interpret_status(&fail),
            VerificationStatus::Failed("Fail - Unable to verify".to_string())
        );
    }

    #[test]
    fn test_verifier_requires_explorer_and_key() {
        let local = get_network_config("hardhat", None).unwrap();
        assert!(matches!(
            EtherscanVerifier::new(&local, Some("key")),
            Err(ContractError::VerificationError(_))
        ));

        let base = get_network_config("base", None).unwrap();
        assert!(matches!(EtherscanVerifier::new(&base, None), Err(ContractError::ConfigError(_))));
        assert!(EtherscanVerifier::new(&base, Some("key")).is_ok());
    }
}
