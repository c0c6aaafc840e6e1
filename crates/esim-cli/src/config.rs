//! Run configuration for `esimctl`.

use anyhow::Context;
use esim_adapters::{CompletionScript, SimulatedPlatformConfig};
use esim_core::{CompletionEvent, OrchestratorConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Contents of a `--config` file. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub platform: SimulatedPlatformConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Command-line values layered over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub no_privileges: bool,
    pub service_disabled: bool,
    pub api_level: Option<u32>,
    pub result_code: Option<i32>,
    pub detail_code: Option<i32>,
    pub delay_ms: Option<u64>,
    pub silent: bool,
    pub transport_failure: Option<String>,
    pub timeout_ms: Option<u64>,
    pub no_switch: bool,
}

impl RunConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn apply(mut self, overrides: &Overrides) -> Self {
        let platform = &mut self.platform;
        if overrides.no_privileges {
            platform.carrier_privileges = false;
        }
        if overrides.service_disabled {
            platform.service_enabled = false;
        }
        if let Some(api_level) = overrides.api_level {
            platform.api_level = api_level;
        }

        if let Some(reason) = &overrides.transport_failure {
            platform.script = CompletionScript::TransportFailure {
                reason: reason.clone(),
            };
        } else if overrides.silent {
            platform.script = CompletionScript::Silent;
        } else if overrides.result_code.is_some()
            || overrides.detail_code.is_some()
            || overrides.delay_ms.is_some()
        {
            let (base_event, base_delay) = match &platform.script {
                CompletionScript::Complete { event, delay_ms } => (*event, *delay_ms),
                _ => (CompletionEvent::ok(), 0),
            };
            platform.script = CompletionScript::Complete {
                event: CompletionEvent::new(
                    overrides.result_code.unwrap_or(base_event.result_code),
                    overrides.detail_code.or(base_event.detail_code),
                ),
                delay_ms: overrides.delay_ms.unwrap_or(base_delay),
            };
        }

        if let Some(timeout_ms) = overrides.timeout_ms {
            self.orchestrator.completion_timeout = Some(Duration::from_millis(timeout_ms));
        }
        if overrides.no_switch {
            self.orchestrator.switch_after_download = false;
        }
        self
    }
}
