use std::collections::HashMap;

use ethers::abi::Token;
use ethers::types::Bytes;
use tracing::{debug, error, info};

use crate::domain::errors::{ContractError, DeployError};
use crate::domain::models::{
    Artifact, DeployedResource, DeploymentPlan, RunResult, StepArg, StepKind, StepOutcome,
    StepSpec, StepState,
};
use crate::domain::services::{ArtifactProvider, ResourceExecutor};

/// Runs a [`DeploymentPlan`] one step at a time.
///
/// Each step is submitted only after the previous one is confirmed. The first
/// failure aborts the run; resources created before it are left in place and
/// nothing is retried.
pub struct DeploymentOrchestrator<'a, E: ?Sized, A: ?Sized> {
    executor: &'a E,
    artifacts: &'a A,
}

impl<'a, E, A> DeploymentOrchestrator<'a, E, A>
where
    E: ResourceExecutor + ?Sized,
    A: ArtifactProvider + ?Sized,
{
    pub fn new(executor: &'a E, artifacts: &'a A) -> Self {
        Self { executor, artifacts }
    }

    pub async fn execute(&self, plan: &DeploymentPlan) -> Result<RunResult, DeployError> {
        let artifacts = load_plan_artifacts(plan, self.artifacts)?;

        info!("Executing deployment plan with {} steps", plan.len());

        let mut confirmed: Vec<Option<DeployedResource>> = vec![None; plan.len()];
        let mut result = RunResult::default();

        for (step_index, step) in plan.steps().iter().enumerate() {
            debug!(step_index, state = %StepState::Pending, "{}", step.label);
            let args = resolve_args(step_index, &step.args, &confirmed)?;

            let outcome = match &step.kind {
                StepKind::Deploy { artifact: name } => {
                    let artifact = lookup(&artifacts, name)?;
                    let resource = self.deploy(step_index, step, name, artifact, args).await?;
                    info!("{} deployed to: {:?}", resource.name, resource.address);

                    let outcome = StepOutcome {
                        step_index,
                        label: step.label.clone(),
                        state: StepState::Confirmed,
                        receipt: resource.receipt.clone(),
                        resource: Some(resource.address),
                    };
                    result.resources.push(resource.clone());
                    confirmed[step_index] = Some(resource);
                    outcome
                }
                StepKind::Invoke { target, method } => {
                    let target_resource = confirmed[*target].as_ref().ok_or(
                        DeployError::UnresolvedReference { step_index, referenced: *target },
                    )?;
                    let artifact = lookup(&artifacts, &target_resource.name)?;

                    let pending = self
                        .executor
                        .invoke(target_resource.address, &artifact.abi, method, args)
                        .await
                        .map_err(|cause| step_failure(step_index, step, cause))?;
                    debug!(step_index, state = %StepState::Submitted, tx = ?pending.tx_hash, "{}", step.label);

                    let receipt = self
                        .executor
                        .await_confirmation(pending)
                        .await
                        .map_err(|cause| step_failure(step_index, step, cause))?;
                    info!(
                        "{}.{} confirmed in block {} (tx 0x{:x})",
                        target_resource.name, method, receipt.block_number, receipt.transaction_hash
                    );

                    StepOutcome {
                        step_index,
                        label: step.label.clone(),
                        state: StepState::Confirmed,
                        receipt,
                        resource: None,
                    }
                }
            };

            debug!(step_index, state = %outcome.state, "{}", step.label);
            result.steps.push(outcome);
        }

        info!(
            "Deployment plan complete: {} resources, {} steps confirmed",
            result.resources.len(),
            result.steps.len()
        );
        Ok(result)
    }

    async fn deploy(
        &self,
        step_index: usize,
        step: &StepSpec,
        name: &str,
        artifact: &Artifact,
        args: Vec<Token>,
    ) -> Result<DeployedResource, DeployError> {
        let constructor_args = Bytes::from(ethers::abi::encode(&args));

        let pending = self
            .executor
            .deploy_resource(artifact, args)
            .await
            .map_err(|cause| step_failure(step_index, step, cause))?;
        debug!(step_index, state = %StepState::Submitted, tx = ?pending.tx_hash, "{}", step.label);

        let receipt = self
            .executor
            .await_confirmation(pending)
            .await
            .map_err(|cause| step_failure(step_index, step, cause))?;

        let address = receipt.contract_address.ok_or_else(|| {
            step_failure(
                step_index,
                step,
                ContractError::ConfirmationFailure(format!(
                    "receipt 0x{:x} carries no contract address",
                    receipt.transaction_hash
                )),
            )
        })?;

        Ok(DeployedResource {
            step_index,
            name: name.to_string(),
            address,
            receipt,
            constructor_args,
        })
    }
}

/// Validates the plan, loads every artifact it needs and checks call shapes
/// against their ABIs, before anything is sent to the chain.
pub fn load_plan_artifacts<A>(
    plan: &DeploymentPlan,
    provider: &A,
) -> Result<HashMap<String, Artifact>, DeployError>
where
    A: ArtifactProvider + ?Sized,
{
    plan.validate()?;

    let mut artifacts: HashMap<String, Artifact> = HashMap::new();

    for step in plan.steps() {
        if let StepKind::Deploy { artifact: name } = &step.kind {
            if !artifacts.contains_key(name) {
                let artifact = provider.get(name).map_err(|source| DeployError::Artifact {
                    name: name.clone(),
                    source,
                })?;
                artifacts.insert(name.clone(), artifact);
            }

            let artifact = lookup(&artifacts, name)?;
            let expected = artifact
                .abi
                .constructor()
                .map(|c| c.inputs.len())
                .unwrap_or(0);
            check_arity(name, "constructor", expected, step.args.len())?;
        }
    }

    for (step_index, step) in plan.steps().iter().enumerate() {
        if let StepKind::Invoke { target, method } = &step.kind {
            let name = match plan.steps().get(*target).map(|t| &t.kind) {
                Some(StepKind::Deploy { artifact }) => artifact,
                _ => {
                    return Err(DeployError::UnresolvedReference {
                        step_index,
                        referenced: *target,
                    })
                }
            };
            let artifact = lookup(&artifacts, name)?;
            let function = artifact.abi.function(method).map_err(|e| DeployError::Artifact {
                name: name.clone(),
                source: ContractError::from(e),
            })?;
            check_arity(name, method, function.inputs.len(), step.args.len())?;
        }
    }

    Ok(artifacts)
}

fn resolve_args(
    step_index: usize,
    args: &[StepArg],
    confirmed: &[Option<DeployedResource>],
) -> Result<Vec<Token>, DeployError> {
    args.iter()
        .map(|arg| match arg {
            StepArg::Literal(token) => Ok(token.clone()),
            StepArg::ResourceOf(referenced) => confirmed
                .get(*referenced)
                .and_then(Option::as_ref)
                .map(|resource| Token::Address(resource.address))
                .ok_or(DeployError::UnresolvedReference {
                    step_index,
                    referenced: *referenced,
                }),
        })
        .collect()
}

fn lookup<'m>(artifacts: &'m HashMap<String, Artifact>, name: &str) -> Result<&'m Artifact, DeployError> {
    artifacts.get(name).ok_or_else(|| DeployError::Artifact {
        name: name.to_string(),
        source: ContractError::ArtifactError("artifact was not loaded".to_string()),
    })
}

fn check_arity(name: &str, entry: &str, expected: usize, given: usize) -> Result<(), DeployError> {
    if expected == given {
        return Ok(());
    }
    Err(DeployError::Artifact {
        name: name.to_string(),
        source: ContractError::AbiError(format!(
            "{} expects {} arguments, plan passes {}",
            entry, expected, given
        )),
    })
}

fn step_failure(step_index: usize, step: &StepSpec, cause: ContractError) -> DeployError {
    error!(step_index, state = %StepState::Failed, "{} failed: {}", step.label, cause);
    DeployError::StepFailure { step_index, cause }
}
