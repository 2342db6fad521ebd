//! Commit to image tag resolution

pub mod resolver;

pub use resolver::TagResolver;
