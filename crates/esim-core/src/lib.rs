//! eSIM activation orchestration.
//!
//! This crate drives a platform provisioning service through one asynchronous
//! download: privilege and service gates, submission, a single completion
//! event routed by correlation topic, outcome classification, and exactly one
//! listener callback, with guaranteed teardown of the completion registration.

#![deny(unsafe_code)]

pub mod classifier;
pub mod completion;
pub mod config;
pub mod error;
pub mod flow;
pub mod messages;
pub mod orchestrator;
pub mod platform;
pub mod types;

pub use classifier::{classify, classify_event};
pub use completion::{
    CompletionChannel, CompletionHub, CompletionTopic, DeliveryStatus, RegistrationHandle,
    DOWNLOAD_SUBSCRIPTION_ACTION,
};
pub use config::OrchestratorConfig;
pub use error::{ProvisioningError, ProvisioningResult};
pub use flow::{ActivationFlow, OrchestratorState};
pub use messages::{DefaultMessages, MessageCatalog, MessageKey};
pub use orchestrator::{DownloadHandle, DownloadResolution, ProvisioningOrchestrator};
pub use platform::{
    CarrierPrivileges, DownloadListener, PlatformBindings, PlatformCapabilities,
    ProvisioningService,
};
pub use types::{result_code, ActivationRequest, CompletionEvent, Outcome, OutcomeKind, Profile};
