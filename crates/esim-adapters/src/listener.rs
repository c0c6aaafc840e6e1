use esim_core::platform::DownloadListener;
use esim_core::types::Profile;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

/// One listener callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerCall {
    Success { message: String },
    Failure { message: String, profile: Profile },
}

/// Listener that logs every callback and keeps it for later inspection.
#[derive(Debug, Default)]
pub struct RecordingListener {
    calls: Mutex<Vec<ListenerCall>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ListenerCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<ListenerCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    fn record(&self, call: ListenerCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl DownloadListener for RecordingListener {
    fn on_success(&self, message: &str) {
        info!(message, "eSIM download succeeded");
        self.record(ListenerCall::Success {
            message: message.to_string(),
        });
    }

    fn on_failure(&self, message: &str, profile: &Profile) {
        warn!(message, profile_id = profile.id, carrier = %profile.carrier_name, "eSIM download failed");
        self.record(ListenerCall::Failure {
            message: message.to_string(),
            profile: profile.clone(),
        });
    }
}
