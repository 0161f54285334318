pub mod orchestrator;
pub mod verification_service;

pub use orchestrator::*;
pub use verification_service::*;
