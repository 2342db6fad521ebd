//! Deploy orchestration

pub mod orchestrator;

pub use orchestrator::Deployer;
