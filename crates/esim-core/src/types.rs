use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary result codes reported by the provisioning platform.
pub mod result_code {
    pub const OK: i32 = 0;
    pub const RESOLVABLE_ERROR: i32 = 1;
    pub const ERROR: i32 = 2;
}

/// A single download request built from an activation code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationRequest {
    pub activation_code: String,
    /// Ask the platform to switch to the profile once it is downloaded.
    pub switch_after_download: bool,
    pub created_at: DateTime<Utc>,
}

impl ActivationRequest {
    pub fn new(activation_code: impl Into<String>) -> Self {
        Self {
            activation_code: activation_code.into(),
            switch_after_download: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_switch_after_download(mut self, switch_after_download: bool) -> Self {
        self.switch_after_download = switch_after_download;
        self
    }
}

/// The one event the platform emits per submitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub result_code: i32,
    pub detail_code: Option<i32>,
}

impl CompletionEvent {
    pub fn new(result_code: i32, detail_code: Option<i32>) -> Self {
        Self {
            result_code,
            detail_code,
        }
    }

    pub fn ok() -> Self {
        Self::new(result_code::OK, None)
    }

    pub fn is_ok(&self) -> bool {
        self.result_code == result_code::OK
    }
}

/// Profile context attached to a failed download.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub carrier_name: String,
    pub secret: String,
}

impl Profile {
    /// Synthetic record handed out when the platform reports no richer
    /// failure payload. It is not verified profile data.
    pub fn placeholder() -> Self {
        Self {
            id: 123,
            carrier_name: "Spectrum".to_string(),
            secret: "somePassword".to_string(),
        }
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("id", &self.id)
            .field("carrier_name", &self.carrier_name)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Caller-facing result of a completed download round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    ActiveSuccess { message: String },
    /// Downloaded, but the platform cannot activate the profile inline.
    DegradedSuccess { message: String },
    Failure { message: String, profile: Profile },
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::ActiveSuccess { .. } => OutcomeKind::ActiveSuccess,
            Self::DegradedSuccess { .. } => OutcomeKind::DegradedSuccess,
            Self::Failure { .. } => OutcomeKind::Failure,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::ActiveSuccess { message }
            | Self::DegradedSuccess { message }
            | Self::Failure { message, .. } => message,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failure { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    ActiveSuccess,
    DegradedSuccess,
    Failure,
}

impl OutcomeKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::ActiveSuccess => "active_success",
            Self::DegradedSuccess => "degraded_success",
            Self::Failure => "failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_profile_debug_redacts_secret() {
        let rendered = format!("{:?}", Profile::placeholder());
        assert!(rendered.contains("Spectrum"));
        assert!(!rendered.contains("somePassword"));
    }

    #[test]
    fn outcome_serializes_with_kind_tag() {
        let outcome = Outcome::DegradedSuccess {
            message: "inactive".to_string(),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["kind"], "degraded_success");
        assert_eq!(value["message"], "inactive");
    }

    #[test]
    fn activation_request_defaults_to_switching() {
        let request = ActivationRequest::new("LPA:1$smdp.example$ABC123");
        assert!(request.switch_after_download);
        assert!(!request.with_switch_after_download(false).switch_after_download);
    }

    #[test]
    fn outcome_accessors() {
        let failure = Outcome::Failure {
            message: "eSIM download failed".to_string(),
            profile: Profile::placeholder(),
        };
        assert_eq!(failure.message(), "eSIM download failed");
        assert!(!failure.is_success());
        assert_eq!(failure.kind(), OutcomeKind::Failure);

        let active = Outcome::ActiveSuccess {
            message: "eSIM active".to_string(),
        };
        assert!(active.is_success());
    }

    #[test]
    fn only_ok_result_code_is_ok() {
        assert!(CompletionEvent::ok().is_ok());
        assert!(CompletionEvent::new(result_code::OK, Some(7)).is_ok());
        assert!(!CompletionEvent::new(result_code::RESOLVABLE_ERROR, None).is_ok());
        assert!(!CompletionEvent::new(-1, None).is_ok());
    }
}
