//! Simulated device platform assembled from a serializable description.

use esim_core::completion::CompletionHub;
use esim_core::error::ProvisioningError;
use esim_core::platform::PlatformBindings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::device::{ApiLevelCapabilities, FixedCarrierPrivileges, INLINE_ACTIVATION_MIN_API_LEVEL};
use crate::messages::OverrideMessages;
use crate::service::{CompletionScript, SimulatedProvisioningService};

/// Description of a simulated device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedPlatformConfig {
    #[serde(default = "default_true")]
    pub carrier_privileges: bool,

    #[serde(default = "default_true")]
    pub service_enabled: bool,

    #[serde(default = "default_api_level")]
    pub api_level: u32,

    #[serde(default)]
    pub script: CompletionScript,

    /// Message text overrides keyed by message key name.
    #[serde(default)]
    pub messages: BTreeMap<String, String>,
}

impl Default for SimulatedPlatformConfig {
    fn default() -> Self {
        Self {
            carrier_privileges: true,
            service_enabled: true,
            api_level: default_api_level(),
            script: CompletionScript::default(),
            messages: BTreeMap::new(),
        }
    }
}

/// A wired simulated platform.
pub struct SimulatedPlatform {
    pub bindings: PlatformBindings,
    pub service: Arc<SimulatedProvisioningService>,
}

impl SimulatedPlatform {
    pub fn build(
        config: &SimulatedPlatformConfig,
        hub: Arc<CompletionHub>,
    ) -> Result<Self, ProvisioningError> {
        let messages = OverrideMessages::from_names(&config.messages)?;
        let service = Arc::new(
            SimulatedProvisioningService::new(hub.clone(), config.script.clone())
                .with_enabled(config.service_enabled),
        );

        Ok(Self {
            bindings: PlatformBindings {
                service: service.clone(),
                privileges: Arc::new(FixedCarrierPrivileges(config.carrier_privileges)),
                capabilities: Arc::new(ApiLevelCapabilities::new(config.api_level)),
                messages: Arc::new(messages),
                hub,
            },
            service,
        })
    }
}

fn default_true() -> bool {
    true
}

fn default_api_level() -> u32 {
    INLINE_ACTIVATION_MIN_API_LEVEL
}

#[cfg(test)]
mod tests {
    use super::*;
    use esim_core::messages::MessageKey;

    #[test]
    fn empty_json_is_a_healthy_device() {
        let config: SimulatedPlatformConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SimulatedPlatformConfig::default());
    }

    #[test]
    fn build_wires_config_into_bindings() {
        let config = SimulatedPlatformConfig {
            carrier_privileges: false,
            api_level: 28,
            messages: BTreeMap::from([(
                "active_success".to_string(),
                "ready".to_string(),
            )]),
            ..SimulatedPlatformConfig::default()
        };
        let platform = SimulatedPlatform::build(&config, Arc::new(CompletionHub::new())).unwrap();

        assert!(!platform.bindings.privileges.has_carrier_privileges());
        assert!(!platform.bindings.capabilities.supports_inline_activation());
        assert!(platform.bindings.service.is_enabled());
        assert_eq!(
            platform.bindings.messages.resolve(MessageKey::ActiveSuccess),
            "ready"
        );
    }

    #[test]
    fn bad_message_key_fails_the_build() {
        let config = SimulatedPlatformConfig {
            messages: BTreeMap::from([("nope".to_string(), "x".to_string())]),
            ..SimulatedPlatformConfig::default()
        };
        assert!(matches!(
            SimulatedPlatform::build(&config, Arc::new(CompletionHub::new())),
            Err(ProvisioningError::Config(_))
        ));
    }
}
