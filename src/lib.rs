pub mod application;
pub mod domain;
pub mod infrastructure;


// Main exports for external use
pub use application::services::orchestrator::DeploymentOrchestrator;
pub use domain::{ContractError, DeployError, DeploymentPlan, RunResult};
