//! One-shot completion routing between the platform and a waiting download.
//!
//! The [`CompletionHub`] is shared process-wide and routes each event by its
//! [`CompletionTopic`]. A [`CompletionChannel`] belongs to a single
//! orchestrator and owns at most one live registration on the hub.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ProvisioningError, ProvisioningResult};
use crate::types::CompletionEvent;

/// Action name for subscription download completions.
pub const DOWNLOAD_SUBSCRIPTION_ACTION: &str = "download_subscription";

/// Correlates one submission with its completion event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompletionTopic {
    pub action: String,
    pub correlation_id: Uuid,
}

impl CompletionTopic {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            correlation_id: Uuid::new_v4(),
        }
    }

    pub fn for_download() -> Self {
        Self::new(DOWNLOAD_SUBSCRIPTION_ACTION)
    }
}

impl fmt::Display for CompletionTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.action, self.correlation_id)
    }
}

/// What happened to an event handed to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    /// No live registration for the topic; the event was discarded.
    Dropped,
}

/// Process-wide router for completion events.
#[derive(Debug, Default)]
pub struct CompletionHub {
    routes: DashMap<CompletionTopic, oneshot::Sender<CompletionEvent>>,
}

impl CompletionHub {
    pub fn new() -> Self {
        Self {
            routes: DashMap::new(),
        }
    }

    pub fn bind(
        &self,
        topic: CompletionTopic,
    ) -> ProvisioningResult<oneshot::Receiver<CompletionEvent>> {
        match self.routes.entry(topic) {
            Entry::Occupied(occupied) => Err(ProvisioningError::TopicAlreadyBound {
                topic: occupied.key().clone(),
            }),
            Entry::Vacant(vacant) => {
                let (tx, rx) = oneshot::channel();
                vacant.insert(tx);
                Ok(rx)
            }
        }
    }

    /// Remove a route. Returns whether one was bound.
    pub fn unbind(&self, topic: &CompletionTopic) -> bool {
        self.routes.remove(topic).is_some()
    }

    /// Hand an event to whoever is bound to `topic`.
    ///
    /// A route accepts one event; it is consumed by the delivery.
    pub fn deliver(&self, topic: &CompletionTopic, event: CompletionEvent) -> DeliveryStatus {
        let Some((_, sender)) = self.routes.remove(topic) else {
            debug!(topic = %topic, result_code = event.result_code, "dropping event for unbound topic");
            return DeliveryStatus::Dropped;
        };

        match sender.send(event) {
            Ok(()) => DeliveryStatus::Delivered,
            Err(_) => {
                debug!(topic = %topic, "receiver gone, dropping event");
                DeliveryStatus::Dropped
            }
        }
    }

    pub fn is_bound(&self, topic: &CompletionTopic) -> bool {
        self.routes.contains_key(topic)
    }

    pub fn bound_count(&self) -> usize {
        self.routes.len()
    }
}

/// A live registration returned by [`CompletionChannel::register`].
#[derive(Debug)]
pub struct RegistrationHandle {
    topic: CompletionTopic,
    receiver: Option<oneshot::Receiver<CompletionEvent>>,
}

impl RegistrationHandle {
    pub fn topic(&self) -> &CompletionTopic {
        &self.topic
    }
}

/// Single-slot registration owned by one orchestrator.
#[derive(Debug)]
pub struct CompletionChannel {
    hub: Arc<CompletionHub>,
    slot: Mutex<Option<CompletionTopic>>,
}

impl CompletionChannel {
    pub fn new(hub: Arc<CompletionHub>) -> Self {
        Self {
            hub,
            slot: Mutex::new(None),
        }
    }

    pub fn hub(&self) -> &Arc<CompletionHub> {
        &self.hub
    }

    /// Bind a one-shot receiver for `topic`.
    ///
    /// Fails with [`ProvisioningError::AlreadyRegistered`] while another
    /// registration from this channel is live.
    pub fn register(&self, topic: CompletionTopic) -> ProvisioningResult<RegistrationHandle> {
        let mut slot = self.slot();
        if let Some(active) = slot.as_ref() {
            return Err(ProvisioningError::AlreadyRegistered {
                topic: active.clone(),
            });
        }

        let receiver = self.hub.bind(topic.clone())?;
        *slot = Some(topic.clone());
        info!(topic = %topic, "completion channel registered");

        Ok(RegistrationHandle {
            topic,
            receiver: Some(receiver),
        })
    }

    /// Suspend until the platform delivers the event for `handle`.
    ///
    /// Resolves to [`ProvisioningError::Deregistered`] when the registration
    /// is torn down first, including when the event already arrived but was
    /// not consumed before teardown.
    pub async fn await_completion(
        &self,
        handle: &mut RegistrationHandle,
    ) -> ProvisioningResult<CompletionEvent> {
        let topic = handle.topic.clone();
        let deregistered = || ProvisioningError::Deregistered {
            topic: topic.clone(),
        };

        let receiver = handle.receiver.take().ok_or_else(deregistered)?;
        let event = receiver.await.map_err(|_| deregistered())?;

        if !self.is_current(&topic) {
            debug!(topic = %topic, "event arrived after teardown, discarding");
            return Err(deregistered());
        }
        Ok(event)
    }

    /// Tear down `handle`. Safe to call any number of times.
    pub fn deregister(&self, handle: &RegistrationHandle) -> bool {
        self.deregister_topic(&handle.topic)
    }

    /// Returns true only for the call that actually cleared the slot.
    pub fn deregister_topic(&self, topic: &CompletionTopic) -> bool {
        let cleared = {
            let mut slot = self.slot();
            if slot.as_ref() == Some(topic) {
                *slot = None;
                true
            } else {
                false
            }
        };

        if cleared {
            self.hub.unbind(topic);
            info!(topic = %topic, "completion channel deregistered");
        }
        cleared
    }

    /// Tear down whatever registration is live.
    pub fn deregister_active(&self) -> Option<CompletionTopic> {
        let topic = self.slot().take()?;
        self.hub.unbind(&topic);
        info!(topic = %topic, "completion channel force-deregistered");
        Some(topic)
    }

    pub fn active_topic(&self) -> Option<CompletionTopic> {
        self.slot().clone()
    }

    pub fn is_registered(&self) -> bool {
        self.slot().is_some()
    }

    fn is_current(&self, topic: &CompletionTopic) -> bool {
        self.slot().as_ref() == Some(topic)
    }

    fn slot(&self) -> MutexGuard<'_, Option<CompletionTopic>> {
        // The slot holds plain data; a panic elsewhere cannot leave it torn.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
