//! Utility functions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Version information for the deployer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

impl VersionInfo {
    /// `<version>-<git hash>`, the form reported by `GET /version`
    pub fn as_string(&self) -> String {
        format!("{}-{}", self.version, self.git_hash)
    }
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Backoff options for registry polling
#[derive(Debug, Clone)]
pub struct BackoffOptions {
    /// Delay unit, multiplied by the squared attempt number
    pub base_delay: Duration,
    /// Attempts before giving up
    pub max_attempts: u32,
}

impl Default for BackoffOptions {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

/// Delay after a failed attempt `n` (1-based): `n² * base_delay`
pub fn calc_square_backoff(options: &BackoffOptions, attempt: u32) -> Duration {
    options.base_delay * attempt.saturating_mul(attempt)
}

/// Generate a random UUID v4
pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_backoff() {
        let options = BackoffOptions::default();

        assert_eq!(calc_square_backoff(&options, 1), Duration::from_secs(1));
        assert_eq!(calc_square_backoff(&options, 2), Duration::from_secs(4));
        assert_eq!(calc_square_backoff(&options, 3), Duration::from_secs(9));
        assert_eq!(calc_square_backoff(&options, 4), Duration::from_secs(16));
    }

    #[test]
    fn test_generate_uuid_is_unique() {
        assert_ne!(generate_uuid(), generate_uuid());
    }
}
