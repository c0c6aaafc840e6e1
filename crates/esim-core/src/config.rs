//! Orchestrator configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::completion::DOWNLOAD_SUBSCRIPTION_ACTION;
use crate::error::ProvisioningError;

/// Configuration for a [`ProvisioningOrchestrator`](crate::ProvisioningOrchestrator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Action name used for completion topics.
    #[serde(default = "default_completion_action")]
    pub completion_action: String,

    /// Ask the platform to switch to the downloaded profile.
    #[serde(default = "default_true")]
    pub switch_after_download: bool,

    /// Upper bound on the completion wait. `None` waits for as long as the
    /// process lives.
    #[serde(default, with = "optional_millis")]
    pub completion_timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            completion_action: default_completion_action(),
            switch_after_download: true,
            completion_timeout: None,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<(), ProvisioningError> {
        if self.completion_action.trim().is_empty() {
            return Err(ProvisioningError::Config(
                "completion_action must not be empty".to_string(),
            ));
        }
        if self.completion_timeout == Some(Duration::ZERO) {
            return Err(ProvisioningError::Config(
                "completion_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_completion_action() -> String {
    DOWNLOAD_SUBSCRIPTION_ACTION.to_string()
}

fn default_true() -> bool {
    true
}

mod optional_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => {
                s.serialize_some(&u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
            }
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
