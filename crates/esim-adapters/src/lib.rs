//! Platform adapters for eSIM activation.
//!
//! Deterministic implementations of the collaborator traits in `esim-core`,
//! used for local simulation, operator tooling and end-to-end tests.

#![deny(unsafe_code)]

pub mod device;
pub mod listener;
pub mod messages;
pub mod service;
pub mod simulation;

pub use device::{ApiLevelCapabilities, FixedCarrierPrivileges, INLINE_ACTIVATION_MIN_API_LEVEL};
pub use listener::{ListenerCall, RecordingListener};
pub use messages::OverrideMessages;
pub use service::{CompletionScript, SimulatedProvisioningService, SubmissionRecord};
pub use simulation::{SimulatedPlatform, SimulatedPlatformConfig};
