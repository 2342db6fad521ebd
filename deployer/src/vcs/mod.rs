//! Version control backends and scoped checkouts

pub mod checkout;
pub mod command;
pub mod git;
pub mod subversion;

pub use checkout::VersionControl;
pub use git::{CommitStats, GitCli, GitClient};
pub use subversion::{SubversionCli, SubversionClient};
