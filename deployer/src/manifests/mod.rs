//! Kubernetes manifests: reading them from a checkout and rewriting them for a
//! deploy

pub mod reader;
pub mod transform;

pub use reader::load_manifests;
pub use transform::transform;
