use serde::{Deserialize, Serialize};

use crate::error::ProvisioningError;

/// Orchestrator states for one download call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Idle,
    AuthorizationChecking,
    ServiceChecking,
    Submitting,
    AwaitingCompletion,
    Classifying,
    NotifyingListener,
}

impl OrchestratorState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AuthorizationChecking => "authorization_checking",
            Self::ServiceChecking => "service_checking",
            Self::Submitting => "submitting",
            Self::AwaitingCompletion => "awaiting_completion",
            Self::Classifying => "classifying",
            Self::NotifyingListener => "notifying_listener",
        }
    }

    pub fn is_idle(self) -> bool {
        self == Self::Idle
    }
}

/// Enforces the forward order of a download call.
///
/// Any state may drop straight back to `Idle`; every other move must be the
/// next step in the sequence.
#[derive(Debug, Clone)]
pub struct ActivationFlow {
    state: OrchestratorState,
}

impl ActivationFlow {
    pub fn new() -> Self {
        Self {
            state: OrchestratorState::Idle,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn mark_authorization_checking(&mut self) -> Result<(), ProvisioningError> {
        self.advance(
            OrchestratorState::Idle,
            OrchestratorState::AuthorizationChecking,
        )
    }

    pub fn mark_service_checking(&mut self) -> Result<(), ProvisioningError> {
        self.advance(
            OrchestratorState::AuthorizationChecking,
            OrchestratorState::ServiceChecking,
        )
    }

    pub fn mark_submitting(&mut self) -> Result<(), ProvisioningError> {
        self.advance(
            OrchestratorState::ServiceChecking,
            OrchestratorState::Submitting,
        )
    }

    pub fn mark_awaiting_completion(&mut self) -> Result<(), ProvisioningError> {
        self.advance(
            OrchestratorState::Submitting,
            OrchestratorState::AwaitingCompletion,
        )
    }

    pub fn mark_classifying(&mut self) -> Result<(), ProvisioningError> {
        self.advance(
            OrchestratorState::AwaitingCompletion,
            OrchestratorState::Classifying,
        )
    }

    pub fn mark_notifying_listener(&mut self) -> Result<(), ProvisioningError> {
        self.advance(
            OrchestratorState::Classifying,
            OrchestratorState::NotifyingListener,
        )
    }

    pub fn finish(&mut self) {
        self.state = OrchestratorState::Idle;
    }

    fn advance(
        &mut self,
        expected_current: OrchestratorState,
        next: OrchestratorState,
    ) -> Result<(), ProvisioningError> {
        if self.state != expected_current {
            return Err(ProvisioningError::stage_violation(
                expected_current.name(),
                self.state.name(),
            ));
        }
        self.state = next;
        Ok(())
    }
}

impl Default for ActivationFlow {
    fn default() -> Self {
        Self::new()
    }
}
