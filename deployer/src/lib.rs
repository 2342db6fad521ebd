//! Deployer Library
//!
//! Resolves a commit or tag of a configured repository, rewrites the
//! repository's Kubernetes manifests for that version and applies them,
//! either as the stable release or as a single-replica canary.

pub mod app;
pub mod cluster;
pub mod deploy;
pub mod errors;
pub mod events;
pub mod filesys;
pub mod logs;
pub mod manifests;
pub mod models;
pub mod registry;
pub mod server;
pub mod storage;
pub mod tags;
pub mod utils;
pub mod vcs;
