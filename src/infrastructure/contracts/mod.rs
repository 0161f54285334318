// Contract integration module
// Artifact loading, chain execution, deployment records and explorer verification

pub mod addresses;
pub mod artifacts;
pub mod config;
pub mod executor;
pub mod types;
pub mod utils;

// Re-export main components for easy access
pub use artifacts::HardhatArtifacts;
pub use executor::EthersExecutor;
pub use types::*;
pub use utils::verification::EtherscanVerifier;
