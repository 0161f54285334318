use async_trait::async_trait;
use ethers::abi::{Abi, Token};
use ethers::types::Address;

use crate::domain::errors::ContractError;
use crate::domain::models::{Artifact, ConfirmedReceipt, PendingConfirmation};

/// Source of compiled contracts, looked up by contract name.
pub trait ArtifactProvider: Send + Sync {
    fn get(&self, name: &str) -> Result<Artifact, ContractError>;
}

/// Binding to the chain the plan runs against.
///
/// Submissions return as soon as the transaction is broadcast; callers must
/// pass the handle to [`ResourceExecutor::await_confirmation`] before relying
/// on the resulting state.
#[async_trait]
pub trait ResourceExecutor: Send + Sync {
    async fn deploy_resource(
        &self,
        artifact: &Artifact,
        constructor_args: Vec<Token>,
    ) -> Result<PendingConfirmation, ContractError>;

    async fn invoke(
        &self,
        target: Address,
        abi: &Abi,
        method: &str,
        args: Vec<Token>,
    ) -> Result<PendingConfirmation, ContractError>;

    async fn await_confirmation(
        &self,
        pending: PendingConfirmation,
    ) -> Result<ConfirmedReceipt, ContractError>;
}
