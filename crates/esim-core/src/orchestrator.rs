//! End-to-end eSIM download flow.
//!
//! `download_esim` runs the privilege and service gates synchronously,
//! registers the completion channel, then spawns a task that submits the
//! request, waits for the one completion event, classifies it, and notifies
//! the listener. The registration is torn down on every exit path of that
//! task except a failed submission, which leaves it live until `on_destroy`
//! or a late completion event releases it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::classifier::classify_event;
use crate::completion::{CompletionChannel, CompletionTopic, RegistrationHandle};
use crate::config::OrchestratorConfig;
use crate::error::{ProvisioningError, ProvisioningResult};
use crate::flow::{ActivationFlow, OrchestratorState};
use crate::messages::MessageKey;
use crate::platform::{DownloadListener, PlatformBindings};
use crate::types::{ActivationRequest, Outcome, OutcomeKind};

/// How a spawned download task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadResolution {
    /// The listener was called with an outcome of this kind.
    Notified(OutcomeKind),
    /// Submission failed; the registration stays live until `on_destroy` or
    /// a late completion event.
    TransportFailed,
    /// The configured completion timeout elapsed.
    TimedOut,
    /// The registration was torn down before an event was consumed.
    Abandoned,
    /// The task ended abnormally, e.g. the listener panicked.
    Interrupted,
}

/// Handle to an in-flight download.
#[derive(Debug)]
pub struct DownloadHandle {
    topic: CompletionTopic,
    task: JoinHandle<DownloadResolution>,
}

impl DownloadHandle {
    /// Topic the platform must deliver the completion event on.
    pub fn topic(&self) -> &CompletionTopic {
        &self.topic
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) -> DownloadResolution {
        match self.task.await {
            Ok(resolution) => resolution,
            Err(err) => {
                warn!(topic = %self.topic, error = %err, "download task ended abnormally");
                DownloadResolution::Interrupted
            }
        }
    }
}

/// Drives one eSIM download at a time against the bound platform.
#[derive(Clone)]
pub struct ProvisioningOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    listener: Arc<dyn DownloadListener>,
    bindings: PlatformBindings,
    channel: CompletionChannel,
    config: OrchestratorConfig,
    state: watch::Sender<OrchestratorState>,
    /// Serializes the synchronous part of `download_esim` with teardown.
    calls: Mutex<()>,
}

impl ProvisioningOrchestrator {
    pub fn init(
        listener: Arc<dyn DownloadListener>,
        bindings: PlatformBindings,
        config: OrchestratorConfig,
    ) -> ProvisioningResult<Self> {
        config.validate()?;
        let (state, _) = watch::channel(OrchestratorState::Idle);
        let channel = CompletionChannel::new(bindings.hub.clone());

        Ok(Self {
            inner: Arc::new(Inner {
                listener,
                bindings,
                channel,
                config,
                state,
                calls: Mutex::new(()),
            }),
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    pub fn state(&self) -> OrchestratorState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<OrchestratorState> {
        self.inner.state.subscribe()
    }

    /// True while a registration is live, including one left behind by a
    /// failed submission.
    pub fn has_pending_download(&self) -> bool {
        self.inner.channel.is_registered()
    }

    /// Start downloading the profile identified by `activation_code`.
    ///
    /// Gate rejections are logged and returned here; the listener is never
    /// told about them. Outside a Tokio runtime this fails with
    /// [`ProvisioningError::InvariantViolation`] before anything is registered.
    #[instrument(skip(self, activation_code))]
    pub fn download_esim(&self, activation_code: &str) -> ProvisioningResult<DownloadHandle> {
        let inner = &self.inner;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            ProvisioningError::InvariantViolation(
                "download_esim must be called from within a Tokio runtime".to_string(),
            )
        })?;
        let (flow, request, registration) = {
            let _calls = inner.lock_calls();

            if let Some(topic) = inner.channel.active_topic() {
                warn!(topic = %topic, "download already in flight, rejecting");
                return Err(ProvisioningError::AlreadyRegistered { topic });
            }

            let mut flow = ActivationFlow::new();
            inner.step(&mut flow, ActivationFlow::mark_authorization_checking)?;
            if !inner.bindings.privileges.has_carrier_privileges() {
                info!("{}", inner.message(MessageKey::NoPrivileges));
                inner.return_to_idle(&mut flow);
                return Err(ProvisioningError::AuthorizationDenied);
            }
            info!("{}", inner.message(MessageKey::PrivilegesReady));

            inner.step(&mut flow, ActivationFlow::mark_service_checking)?;
            if !inner.bindings.service.is_enabled() {
                info!("{}", inner.message(MessageKey::ServiceDisabled));
                inner.return_to_idle(&mut flow);
                return Err(ProvisioningError::ServiceUnavailable);
            }

            inner.step(&mut flow, ActivationFlow::mark_submitting)?;
            let request = ActivationRequest::new(activation_code)
                .with_switch_after_download(inner.config.switch_after_download);
            let topic = CompletionTopic::new(inner.config.completion_action.clone());
            match inner.channel.register(topic) {
                Ok(registration) => (flow, request, registration),
                Err(err) => {
                    inner.return_to_idle(&mut flow);
                    return Err(err);
                }
            }
        };

        // The live registration now rejects concurrent calls on its own.
        let topic = registration.topic().clone();
        let guard = TeardownGuard {
            inner: inner.clone(),
            topic: topic.clone(),
            armed: true,
        };
        let task = runtime.spawn(inner.clone().run_download(flow, request, registration, guard));

        info!(topic = %topic, "activation dispatched");
        Ok(DownloadHandle { topic, task })
    }

    /// Force teardown of the live registration, if any.
    ///
    /// The platform's own submission keeps running; its event is dropped.
    pub fn on_destroy(&self) -> Option<CompletionTopic> {
        let _calls = self.inner.lock_calls();
        let topic = self.inner.channel.deregister_active();
        self.inner.state.send_replace(OrchestratorState::Idle);

        match &topic {
            Some(topic) => info!(topic = %topic, "forced teardown"),
            None => debug!("on_destroy with no live registration"),
        }
        topic
    }
}

impl Inner {
    async fn run_download(
        self: Arc<Self>,
        mut flow: ActivationFlow,
        request: ActivationRequest,
        mut registration: RegistrationHandle,
        mut guard: TeardownGuard,
    ) -> DownloadResolution {
        let topic = registration.topic().clone();

        if let Err(err) = self
            .bindings
            .service
            .submit_activation(&request, &topic)
            .await
        {
            error!(topic = %topic, error = %err, "activation submission failed");
            guard.disarm();
            self.publish_for(&topic, OrchestratorState::Idle);
            tokio::spawn(self.clone().release_on_late_completion(registration));
            return DownloadResolution::TransportFailed;
        }
        drop(request);

        if !self.step_for(&topic, &mut flow, ActivationFlow::mark_awaiting_completion) {
            return DownloadResolution::Interrupted;
        }

        let waited = match self.config.completion_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.channel.await_completion(&mut registration))
                    .await
                {
                    Ok(waited) => waited,
                    Err(_) => {
                        let timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                        warn!(topic = %topic, timeout_ms, "completion wait timed out");
                        return DownloadResolution::TimedOut;
                    }
                }
            }
            None => self.channel.await_completion(&mut registration).await,
        };

        let event = match waited {
            Ok(event) => event,
            Err(err) => {
                info!(topic = %topic, reason = %err, "download abandoned");
                return DownloadResolution::Abandoned;
            }
        };
        info!(
            topic = %topic,
            result_code = event.result_code,
            detail_code = ?event.detail_code,
            "completion received"
        );

        if !self.step_for(&topic, &mut flow, ActivationFlow::mark_classifying) {
            return DownloadResolution::Interrupted;
        }
        let inline = self.bindings.capabilities.supports_inline_activation();
        let outcome = classify_event(&event, inline, self.bindings.messages.as_ref());

        if !self.step_for(&topic, &mut flow, ActivationFlow::mark_notifying_listener) {
            return DownloadResolution::Interrupted;
        }
        self.notify(&outcome);

        guard.release();
        DownloadResolution::Notified(outcome.kind())
    }

    /// Keep a failed submission's registration until the platform answers
    /// anyway or `on_destroy` tears it down. The event is never classified.
    async fn release_on_late_completion(self: Arc<Self>, mut registration: RegistrationHandle) {
        let topic = registration.topic().clone();
        match self.channel.await_completion(&mut registration).await {
            Ok(event) => {
                info!(
                    topic = %topic,
                    result_code = event.result_code,
                    "completion arrived after failed submission, releasing registration"
                );
                self.teardown(&topic);
            }
            Err(err) => debug!(topic = %topic, reason = %err, "failed submission released"),
        }
    }

    fn notify(&self, outcome: &Outcome) {
        match outcome {
            Outcome::ActiveSuccess { message } | Outcome::DegradedSuccess { message } => {
                self.listener.on_success(message)
            }
            Outcome::Failure { message, profile } => self.listener.on_failure(message, profile),
        }
    }

    fn message(&self, key: MessageKey) -> String {
        self.bindings.messages.resolve(key)
    }

    /// Advance and publish while holding the call lock.
    fn step(
        &self,
        flow: &mut ActivationFlow,
        advance: fn(&mut ActivationFlow) -> ProvisioningResult<()>,
    ) -> ProvisioningResult<()> {
        advance(flow)?;
        self.state.send_replace(flow.state());
        Ok(())
    }

    /// Advance from the download task. Publishes only while `topic` still
    /// owns the channel.
    fn step_for(
        &self,
        topic: &CompletionTopic,
        flow: &mut ActivationFlow,
        advance: fn(&mut ActivationFlow) -> ProvisioningResult<()>,
    ) -> bool {
        if let Err(err) = advance(flow) {
            error!(topic = %topic, error = %err, "download flow out of order");
            return false;
        }
        self.publish_for(topic, flow.state());
        true
    }

    fn publish_for(&self, topic: &CompletionTopic, state: OrchestratorState) {
        let _calls = self.lock_calls();
        if self.channel.active_topic().as_ref() == Some(topic) {
            self.state.send_replace(state);
        }
    }

    fn return_to_idle(&self, flow: &mut ActivationFlow) {
        flow.finish();
        self.state.send_replace(flow.state());
    }

    fn teardown(&self, topic: &CompletionTopic) {
        let _calls = self.lock_calls();
        if self.channel.deregister_topic(topic) {
            self.state.send_replace(OrchestratorState::Idle);
        }
    }

    fn lock_calls(&self) -> MutexGuard<'_, ()> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Deregisters the download's topic when dropped, including on unwind.
struct TeardownGuard {
    inner: Arc<Inner>,
    topic: CompletionTopic,
    armed: bool,
}

impl TeardownGuard {
    fn release(mut self) {
        self.teardown_once();
    }

    /// Leave the registration in place for `on_destroy`.
    fn disarm(&mut self) {
        self.armed = false;
    }

    fn teardown_once(&mut self) {
        if std::mem::replace(&mut self.armed, false) {
            self.inner.teardown(&self.topic);
        }
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        self.teardown_once();
    }
}
