use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::{
    abi::{Abi, Token},
    contract::ContractFactory,
    middleware::{signer::SignerMiddlewareError, SignerMiddleware},
    providers::{Http, Middleware, MiddlewareError, PendingTransaction, Provider, ProviderError},
    signers::{LocalWallet, Signer},
    types::{
        transaction::eip2718::TypedTransaction, Address, TransactionReceipt, TransactionRequest, U256, U64,
    },
};
use tracing::{debug, info};

use crate::domain::errors::ContractError;
use crate::domain::models::{Artifact, ConfirmedReceipt, PendingConfirmation};
use crate::domain::services::ResourceExecutor;
use crate::infrastructure::contracts::types::DeployerConfig;

pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Executes plan steps against a JSON-RPC node with a local signing key.
///
/// The account nonce is filled by the signer middleware at submission time,
/// so callers must not submit again until the previous transaction is
/// confirmed.
#[derive(Clone)]
pub struct EthersExecutor {
    client: Arc<SignerClient>,
    confirmations: usize,
    confirmation_timeout: Option<Duration>,
    poll_interval: Duration,
}

impl EthersExecutor {
    pub async fn new(config: &DeployerConfig) -> Result<Self, ContractError> {
        // Create provider
        let provider = Provider::<Http>::try_from(config.network.rpc_url.as_str())
            .map_err(|e| ContractError::TransportError(e.to_string()))?;

        // Make sure the endpoint serves the chain we were configured for
        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| ContractError::TransportError(format!("Failed to get chain id: {}", e)))?;
        if chain_id != U256::from(config.network.chain_id) {
            return Err(ContractError::ConfigError(format!(
                "Chain ID mismatch: endpoint reports {}, {} expects {}",
                chain_id, config.network.name, config.network.chain_id
            )));
        }

        // Create wallet
        let wallet = config
            .signing_key()?
            .parse::<LocalWallet>()
            .map_err(|e| ContractError::InvalidSignature { reason: e.to_string() })?
            .with_chain_id(config.network.chain_id);

        info!(
            "Connected to {} (chain {}) as {:?}",
            config.network.name,
            config.network.chain_id,
            wallet.address()
        );

        Ok(Self {
            client: Arc::new(SignerMiddleware::new(provider, wallet)),
            confirmations: config.confirmations.max(1),
            confirmation_timeout: config.confirmation_timeout,
            poll_interval: Duration::from_secs(config.network.block_time_seconds.max(1)),
        })
    }

    /// Address of the signing account
    pub fn address(&self) -> Address {
        self.client.address()
    }

    pub async fn balance(&self) -> Result<U256, ContractError> {
        self.client
            .get_balance(self.address(), None)
            .await
            .map_err(|e| ContractError::TransportError(format!("Failed to get balance: {}", e)))
    }

    async fn submit(&self, tx: TypedTransaction) -> Result<PendingConfirmation, ContractError> {
        let pending_tx = self.client.send_transaction(tx, None).await.map_err(classify_send_error)?;
        Ok(PendingConfirmation { tx_hash: pending_tx.tx_hash() })
    }
}

#[async_trait]
impl ResourceExecutor for EthersExecutor {
    async fn deploy_resource(
        &self,
        artifact: &Artifact,
        constructor_args: Vec<Token>,
    ) -> Result<PendingConfirmation, ContractError> {
        let factory = ContractFactory::new(artifact.abi.clone(), artifact.bytecode.clone(), self.client.clone());
        let deployer = factory.deploy_tokens(constructor_args).map_err(|e| {
            ContractError::SubmissionError(format!("Failed to build {} deployment: {}", artifact.name, e))
        })?;

        let pending = self.submit(deployer.tx).await?;
        debug!("{} deployment sent: 0x{:x}", artifact.name, pending.tx_hash);
        Ok(pending)
    }

    async fn invoke(
        &self,
        target: Address,
        abi: &Abi,
        method: &str,
        args: Vec<Token>,
    ) -> Result<PendingConfirmation, ContractError> {
        let data = abi.function(method)?.encode_input(&args)?;
        let tx = TransactionRequest::new().to(target).data(data);

        let pending = self.submit(tx.into()).await?;
        debug!("{} call on {:?} sent: 0x{:x}", method, target, pending.tx_hash);
        Ok(pending)
    }

    async fn await_confirmation(
        &self,
        pending: PendingConfirmation,
    ) -> Result<ConfirmedReceipt, ContractError> {
        let pending_tx = PendingTransaction::new(pending.tx_hash, self.client.provider())
            .interval(self.poll_interval)
            .confirmations(self.confirmations);

        // wait for the transaction to be mined
        let receipt = match self.confirmation_timeout {
            Some(timeout) => tokio::time::timeout(timeout, pending_tx).await.map_err(|_| {
                ContractError::ConfirmationFailure(format!(
                    "Transaction 0x{:x} not confirmed within {:?}",
                    pending.tx_hash, timeout
                ))
            })?,
            None => pending_tx.await,
        }
        .map_err(|e| ContractError::TransportError(e.to_string()))?
        .ok_or_else(|| {
            ContractError::ConfirmationFailure(format!(
                "Transaction 0x{:x} dropped from mempool",
                pending.tx_hash
            ))
        })?;

        confirmed_receipt(receipt)
    }
}

/// Reverted transactions are mined but never confirmed.
fn confirmed_receipt(receipt: TransactionReceipt) -> Result<ConfirmedReceipt, ContractError> {
    if receipt.status == Some(U64::zero()) {
        return Err(ContractError::ConfirmationFailure(format!(
            "Transaction 0x{:x} reverted",
            receipt.transaction_hash
        )));
    }

    Ok(ConfirmedReceipt {
        transaction_hash: receipt.transaction_hash,
        block_number: receipt.block_number.unwrap_or_default().as_u64(),
        contract_address: receipt.contract_address,
        gas_used: receipt.gas_used,
    })
}

/// Node-side rejections (JSON-RPC error responses) and local signing
/// failures are submission errors; everything else on the provider is
/// transport.
fn classify_send_error(err: SignerMiddlewareError<Provider<Http>, LocalWallet>) -> ContractError {
    match err {
        SignerMiddlewareError::MiddlewareError(provider) => classify_provider_error(provider),
        other => ContractError::SubmissionError(other.to_string()),
    }
}

fn classify_provider_error(err: ProviderError) -> ContractError {
    if err.is_error_response() {
        ContractError::SubmissionError(err.to_string())
    } else {
        ContractError::TransportError(err.to_string())
    }
}
