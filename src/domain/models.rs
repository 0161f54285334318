use std::fmt;

use ethers::abi::Token;
use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DeployError;

// ============ PLAN MODELS ============

/// Argument passed to a constructor or method call.
#[derive(Debug, Clone, PartialEq)]
pub enum StepArg {
    /// A fixed ABI value.
    Literal(Token),
    /// The address produced by an earlier DEPLOY step, by 0-based index.
    ResourceOf(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    /// Deploy a new contract from the named artifact.
    Deploy { artifact: String },
    /// Call `method` on the contract deployed by step `target`.
    Invoke { target: usize, method: String },
}

/// One unit of work in a [`DeploymentPlan`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepSpec {
    pub label: String,
    pub kind: StepKind,
    pub args: Vec<StepArg>,
}

impl StepSpec {
    pub fn deploy(artifact: impl Into<String>, args: Vec<StepArg>) -> Self {
        let artifact = artifact.into();
        Self {
            label: format!("deploy {}", artifact),
            kind: StepKind::Deploy { artifact },
            args,
        }
    }

    pub fn invoke(target: usize, method: impl Into<String>, args: Vec<StepArg>) -> Self {
        let method = method.into();
        Self {
            label: format!("invoke {} on step {}", method, target),
            kind: StepKind::Invoke { target, method },
            args,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn is_deploy(&self) -> bool {
        matches!(self.kind, StepKind::Deploy { .. })
    }

    /// Every step index this step depends on, in argument order.
    pub fn references(&self) -> Vec<usize> {
        let mut refs = Vec::new();
        if let StepKind::Invoke { target, .. } = &self.kind {
            refs.push(*target);
        }
        refs.extend(self.args.iter().filter_map(|arg| match arg {
            StepArg::ResourceOf(index) => Some(*index),
            StepArg::Literal(_) => None,
        }));
        refs
    }
}

/// Ordered, immutable sequence of steps for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentPlan {
    steps: Vec<StepSpec>,
}

impl DeploymentPlan {
    pub fn builder() -> DeploymentPlanBuilder {
        DeploymentPlanBuilder::default()
    }

    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Checks that the plan is non-empty and that every reference points at
    /// an earlier DEPLOY step.
    pub fn validate(&self) -> Result<(), DeployError> {
        if self.steps.is_empty() {
            return Err(DeployError::EmptyPlan);
        }

        for (step_index, step) in self.steps.iter().enumerate() {
            for referenced in step.references() {
                let resolvable = referenced < step_index
                    && self.steps.get(referenced).is_some_and(StepSpec::is_deploy);
                if !resolvable {
                    return Err(DeployError::UnresolvedReference { step_index, referenced });
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct DeploymentPlanBuilder {
    steps: Vec<StepSpec>,
}

impl DeploymentPlanBuilder {
    /// Appends a step and returns its index, for use in later references.
    pub fn push(&mut self, step: StepSpec) -> usize {
        self.steps.push(step);
        self.steps.len() - 1
    }

    pub fn build(self) -> DeploymentPlan {
        DeploymentPlan { steps: self.steps }
    }
}

// ============ ARTIFACT MODELS ============

/// Compiled contract: interface description plus creation bytecode.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub name: String,
    pub source_name: String,
    pub abi: ethers::abi::Abi,
    pub bytecode: Bytes,
}

impl Artifact {
    /// Fully qualified name in `path/To.sol:Contract` form.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.name)
    }
}

// ============ EXECUTION MODELS ============

/// Lifecycle of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Submitted,
    Confirmed,
    Failed,
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepState::Pending => "pending",
            StepState::Submitted => "submitted",
            StepState::Confirmed => "confirmed",
            StepState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Handle to a broadcast transaction that has not been confirmed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingConfirmation {
    pub tx_hash: H256,
}

/// Receipt of a transaction the chain has durably accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedReceipt {
    pub transaction_hash: H256,
    pub block_number: u64,
    pub contract_address: Option<Address>,
    pub gas_used: Option<U256>,
}

/// A contract created by a confirmed DEPLOY step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedResource {
    pub step_index: usize,
    pub name: String,
    pub address: Address,
    pub receipt: ConfirmedReceipt,
    /// ABI-encoded constructor arguments, as explorers expect them.
    pub constructor_args: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub step_index: usize,
    pub label: String,
    pub state: StepState,
    pub receipt: ConfirmedReceipt,
    pub resource: Option<Address>,
}

/// Outcome of a fully successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    pub resources: Vec<DeployedResource>,
    pub steps: Vec<StepOutcome>,
}

impl RunResult {
    pub fn addresses(&self) -> Vec<Address> {
        self.resources.iter().map(|r| r.address).collect()
    }

    pub fn resource(&self, name: &str) -> Option<&DeployedResource> {
        self.resources.iter().find(|r| r.name == name)
    }
}
