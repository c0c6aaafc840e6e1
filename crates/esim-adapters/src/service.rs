use async_trait::async_trait;
use esim_core::completion::{CompletionHub, CompletionTopic};
use esim_core::error::ProvisioningError;
use esim_core::platform::ProvisioningService;
use esim_core::types::{ActivationRequest, CompletionEvent};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// How the simulated platform answers a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CompletionScript {
    /// Deliver `event` on the request topic after `delay_ms`.
    Complete {
        event: CompletionEvent,
        #[serde(default)]
        delay_ms: u64,
    },
    /// Accept the submission and never answer.
    Silent,
    /// Reject the submission at the transport level.
    TransportFailure { reason: String },
}

impl CompletionScript {
    pub fn immediate(event: CompletionEvent) -> Self {
        Self::Complete { event, delay_ms: 0 }
    }
}

impl Default for CompletionScript {
    fn default() -> Self {
        Self::immediate(CompletionEvent::ok())
    }
}

/// A submission as seen by the simulated platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub request: ActivationRequest,
    pub topic: CompletionTopic,
}

/// Deterministic stand-in for the platform provisioning service.
///
/// Completion events are delivered from a spawned task through the shared
/// [`CompletionHub`], the same way a real platform signals out of band.
#[derive(Debug)]
pub struct SimulatedProvisioningService {
    hub: Arc<CompletionHub>,
    enabled: bool,
    script: CompletionScript,
    submissions: Mutex<Vec<SubmissionRecord>>,
}

impl SimulatedProvisioningService {
    pub fn new(hub: Arc<CompletionHub>, script: CompletionScript) -> Self {
        Self {
            hub,
            enabled: true,
            script,
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn script(&self) -> &CompletionScript {
        &self.script
    }

    pub fn submissions(&self) -> Vec<SubmissionRecord> {
        self.submissions
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProvisioningService for SimulatedProvisioningService {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn submit_activation(
        &self,
        request: &ActivationRequest,
        topic: &CompletionTopic,
    ) -> Result<(), ProvisioningError> {
        self.submissions
            .lock()
            .map_err(|_| ProvisioningError::transport("submission log lock poisoned"))?
            .push(SubmissionRecord {
                request: request.clone(),
                topic: topic.clone(),
            });

        match &self.script {
            CompletionScript::Complete { event, delay_ms } => {
                let hub = self.hub.clone();
                let topic = topic.clone();
                let event = *event;
                let delay = Duration::from_millis(*delay_ms);
                tokio::spawn(async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let status = hub.deliver(&topic, event);
                    debug!(topic = %topic, status = ?status, "simulated completion emitted");
                });
                Ok(())
            }
            CompletionScript::Silent => Ok(()),
            CompletionScript::TransportFailure { reason } => {
                Err(ProvisioningError::transport(reason.clone()))
            }
        }
    }
}
