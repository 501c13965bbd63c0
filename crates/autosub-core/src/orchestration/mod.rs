//! Session orchestration: sequencing the deploy steps for one owner.

pub mod deployer;
pub mod orchestrator;

pub use deployer::{Collaborators, Deployer};
pub use orchestrator::{DeploymentOrchestrator, SessionOutcome};
