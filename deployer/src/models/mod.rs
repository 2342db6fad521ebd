//! Domain models

pub mod image;
pub mod manifest;
pub mod repository;
pub mod request;
pub mod version;
