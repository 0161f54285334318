/// Errors raised by the collaborators the orchestrator talks to: the chain
/// binding, the artifact store, configuration and the explorer.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("Submission error: {0}")]
    SubmissionError(String),

    #[error("Confirmation failure: {0}")]
    ConfirmationFailure(String),

    #[error("RPC error: {0}")]
    TransportError(String),

    #[error("Invalid signature: {reason}")]
    InvalidSignature { reason: String },

    #[error("ABI error: {0}")]
    AbiError(String),

    #[error("Artifact error: {0}")]
    ArtifactError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Verification error: {0}")]
    VerificationError(String),
}

impl From<ethers::abi::Error> for ContractError {
    fn from(err: ethers::abi::Error) -> Self {
        ContractError::AbiError(err.to_string())
    }
}

/// Errors returned by [`crate::application::services::orchestrator::DeploymentOrchestrator::execute`].
///
/// Step indices are 0-based positions in the plan.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("deployment plan has no steps")]
    EmptyPlan,

    #[error("step {step_index} references step {referenced}, which does not produce a confirmed resource before it")]
    UnresolvedReference { step_index: usize, referenced: usize },

    #[error("artifact {name} unusable: {source}")]
    Artifact {
        name: String,
        #[source]
        source: ContractError,
    },

    #[error("step {step_index} failed: {cause}")]
    StepFailure {
        step_index: usize,
        #[source]
        cause: ContractError,
    },
}

impl DeployError {
    /// Index of the step that failed at execution time, if any.
    pub fn failed_step(&self) -> Option<usize> {
        match self {
            DeployError::StepFailure { step_index, .. } => Some(*step_index),
            _ => None,
        }
    }
}
