use async_trait::async_trait;
use std::sync::Arc;

use crate::completion::{CompletionHub, CompletionTopic};
use crate::error::ProvisioningError;
use crate::messages::MessageCatalog;
use crate::types::{ActivationRequest, Profile};

/// Platform subscription-provisioning service.
///
/// `submit_activation` only hands the request over. The platform reports the
/// result later by delivering one event for `topic` on the [`CompletionHub`].
#[async_trait]
pub trait ProvisioningService: Send + Sync {
    fn is_enabled(&self) -> bool;

    async fn submit_activation(
        &self,
        request: &ActivationRequest,
        topic: &CompletionTopic,
    ) -> Result<(), ProvisioningError>;
}

/// Carrier-privilege authorization check.
pub trait CarrierPrivileges: Send + Sync {
    fn has_carrier_privileges(&self) -> bool;
}

/// Platform capability detection.
pub trait PlatformCapabilities: Send + Sync {
    fn supports_inline_activation(&self) -> bool;
}

/// Receives the outcome of each completed download.
///
/// Invoked at most once per download, from the download task.
pub trait DownloadListener: Send + Sync {
    fn on_success(&self, message: &str);

    fn on_failure(&self, message: &str, profile: &Profile);
}

/// Everything the orchestrator consumes from the platform.
#[derive(Clone)]
pub struct PlatformBindings {
    pub service: Arc<dyn ProvisioningService>,
    pub privileges: Arc<dyn CarrierPrivileges>,
    pub capabilities: Arc<dyn PlatformCapabilities>,
    pub messages: Arc<dyn MessageCatalog>,
    pub hub: Arc<CompletionHub>,
}
