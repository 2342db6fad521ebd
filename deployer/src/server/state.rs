//! Server state

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::deploy::Deployer;
use crate::events::EventLog;

/// Server state shared across handlers
pub struct ServerState {
    pub deployer: Arc<Deployer>,
    pub events: Arc<EventLog>,
    /// Basic auth password; the API is open when unset
    pub auth_token: Option<SecretString>,
    /// Upper bound on a single deploy
    pub request_timeout: Duration,
}

impl ServerState {
    pub fn new(
        deployer: Arc<Deployer>,
        events: Arc<EventLog>,
        auth_token: Option<SecretString>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            deployer,
            events,
            auth_token,
            request_timeout,
        }
    }
}
