//! Maps platform completion codes onto caller-facing outcomes.

use tracing::debug;

use crate::messages::{MessageCatalog, MessageKey};
use crate::types::{result_code, CompletionEvent, Outcome, Profile};

/// Classify a completed round trip.
///
/// Any code other than [`result_code::OK`] is a failure, including codes the
/// platform may add later. The detail code is diagnostic only.
pub fn classify(
    primary_result_code: i32,
    supports_inline_activation: bool,
    detail_code: Option<i32>,
    messages: &dyn MessageCatalog,
) -> Outcome {
    debug!(
        result_code = primary_result_code,
        detail_code = ?detail_code,
        supports_inline_activation,
        "classifying completion"
    );

    if primary_result_code == result_code::OK {
        if supports_inline_activation {
            Outcome::ActiveSuccess {
                message: messages.resolve(MessageKey::ActiveSuccess),
            }
        } else {
            Outcome::DegradedSuccess {
                message: messages.resolve(MessageKey::InactiveSuccess),
            }
        }
    } else {
        Outcome::Failure {
            message: messages.resolve(MessageKey::DownloadFailure),
            profile: Profile::placeholder(),
        }
    }
}

/// Convenience wrapper over [`classify`] for a received event.
pub fn classify_event(
    event: &CompletionEvent,
    supports_inline_activation: bool,
    messages: &dyn MessageCatalog,
) -> Outcome {
    classify(
        event.result_code,
        supports_inline_activation,
        event.detail_code,
        messages,
    )
}
