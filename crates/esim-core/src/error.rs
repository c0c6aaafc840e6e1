use thiserror::Error;

use crate::completion::CompletionTopic;

/// Errors raised by the eSIM activation flow.
///
/// None of these reach the download listener; they are logged where they
/// occur and returned to the direct caller only.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("carrier privileges not granted to this caller")]
    AuthorizationDenied,

    #[error("eSIM provisioning service is disabled on this device")]
    ServiceUnavailable,

    #[error("activation submission failed: {message}")]
    Transport { message: String },

    #[error("a download is already in flight on topic '{topic}'")]
    AlreadyRegistered { topic: CompletionTopic },

    #[error("completion topic '{topic}' was deregistered before an event arrived")]
    Deregistered { topic: CompletionTopic },

    #[error("completion topic '{topic}' is already bound on the hub")]
    TopicAlreadyBound { topic: CompletionTopic },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProvisioningError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn stage_violation(expected: &str, actual: &str) -> Self {
        Self::InvariantViolation(format!(
            "flow order violation: expected '{}', got '{}'",
            expected, actual
        ))
    }

    /// True for rejections that happen before any registration is made.
    pub fn is_gate_rejection(&self) -> bool {
        matches!(
            self,
            Self::AuthorizationDenied | Self::ServiceUnavailable | Self::AlreadyRegistered { .. }
        )
    }
}

pub type ProvisioningResult<T> = Result<T, ProvisioningError>;
