//! End-to-end downloads against the simulated platform.

use esim_adapters::{
    CompletionScript, ListenerCall, RecordingListener, SimulatedPlatform, SimulatedPlatformConfig,
};
use esim_core::{
    result_code, CompletionEvent, CompletionHub, DeliveryStatus, DownloadResolution,
    OrchestratorConfig, OrchestratorState, OutcomeKind, Profile, ProvisioningError,
    ProvisioningOrchestrator,
};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    hub: Arc<CompletionHub>,
    platform: SimulatedPlatform,
    listener: Arc<RecordingListener>,
    orchestrator: ProvisioningOrchestrator,
}

fn harness(config: SimulatedPlatformConfig) -> Harness {
    harness_on(Arc::new(CompletionHub::new()), config, OrchestratorConfig::default())
}

fn harness_on(
    hub: Arc<CompletionHub>,
    config: SimulatedPlatformConfig,
    orchestrator_config: OrchestratorConfig,
) -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("esim_core=debug,esim_adapters=debug")
        .with_test_writer()
        .try_init();

    let platform = SimulatedPlatform::build(&config, hub.clone()).unwrap();
    let listener = Arc::new(RecordingListener::new());
    let orchestrator = ProvisioningOrchestrator::init(
        listener.clone(),
        platform.bindings.clone(),
        orchestrator_config,
    )
    .unwrap();
    Harness {
        hub,
        platform,
        listener,
        orchestrator,
    }
}

fn completing_with(event: CompletionEvent) -> SimulatedPlatformConfig {
    SimulatedPlatformConfig {
        script: CompletionScript::immediate(event),
        ..SimulatedPlatformConfig::default()
    }
}

#[tokio::test]
async fn ok_on_inline_platform_reports_active() {
    let h = harness(SimulatedPlatformConfig::default());

    let handle = h.orchestrator.download_esim("LPA:1$smdp.example$ABC").unwrap();
    let topic = handle.topic().clone();
    assert_eq!(
        handle.join().await,
        DownloadResolution::Notified(OutcomeKind::ActiveSuccess)
    );

    assert_eq!(
        h.listener.calls(),
        vec![ListenerCall::Success {
            message: "eSIM active".to_string()
        }]
    );
    let submissions = h.platform.service.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].request.activation_code, "LPA:1$smdp.example$ABC");
    assert!(submissions[0].request.switch_after_download);
    assert_eq!(submissions[0].topic, topic);

    assert!(!h.orchestrator.has_pending_download());
    assert!(!h.hub.is_bound(&topic));
    assert_eq!(h.orchestrator.state(), OrchestratorState::Idle);
}

#[tokio::test]
async fn ok_on_legacy_platform_reports_degraded_success() {
    let h = harness(SimulatedPlatformConfig {
        api_level: 28,
        ..SimulatedPlatformConfig::default()
    });

    let resolution = h.orchestrator.download_esim("ABC").unwrap().join().await;
    assert_eq!(
        resolution,
        DownloadResolution::Notified(OutcomeKind::DegradedSuccess)
    );
    assert!(matches!(
        h.listener.last(),
        Some(ListenerCall::Success { message }) if message.contains("inactive")
    ));
}

#[tokio::test]
async fn error_result_reports_failure_with_placeholder_profile() {
    for code in [result_code::ERROR, result_code::RESOLVABLE_ERROR] {
        let h = harness(completing_with(CompletionEvent::new(code, Some(10))));

        let resolution = h.orchestrator.download_esim("ABC").unwrap().join().await;
        assert_eq!(resolution, DownloadResolution::Notified(OutcomeKind::Failure));
        assert_eq!(
            h.listener.calls(),
            vec![ListenerCall::Failure {
                message: "eSIM download failed".to_string(),
                profile: Profile::placeholder(),
            }]
        );
    }
}

#[tokio::test]
async fn missing_privileges_never_reaches_the_platform() {
    let h = harness(SimulatedPlatformConfig {
        carrier_privileges: false,
        ..SimulatedPlatformConfig::default()
    });

    let err = h.orchestrator.download_esim("ABC").unwrap_err();
    assert!(matches!(err, ProvisioningError::AuthorizationDenied));
    assert!(h.platform.service.submissions().is_empty());
    assert!(h.listener.calls().is_empty());
    assert_eq!(h.hub.bound_count(), 0);
}

#[tokio::test]
async fn disabled_service_never_receives_a_submission() {
    let h = harness(SimulatedPlatformConfig {
        service_enabled: false,
        ..SimulatedPlatformConfig::default()
    });

    let err = h.orchestrator.download_esim("ABC").unwrap_err();
    assert!(matches!(err, ProvisioningError::ServiceUnavailable));
    assert!(h.platform.service.submissions().is_empty());
    assert!(h.listener.calls().is_empty());
    assert!(!h.orchestrator.has_pending_download());
}

#[tokio::test]
async fn late_duplicate_event_is_dropped() {
    let h = harness(SimulatedPlatformConfig::default());

    let handle = h.orchestrator.download_esim("ABC").unwrap();
    let topic = handle.topic().clone();
    handle.join().await;

    assert_eq!(
        h.hub.deliver(&topic, CompletionEvent::ok()),
        DeliveryStatus::Dropped
    );
    assert_eq!(h.listener.calls().len(), 1);
}

#[tokio::test]
async fn silent_platform_is_released_by_on_destroy() {
    let h = harness(SimulatedPlatformConfig {
        script: CompletionScript::Silent,
        ..SimulatedPlatformConfig::default()
    });

    let handle = h.orchestrator.download_esim("ABC").unwrap();
    let topic = handle.topic().clone();
    assert!(h.orchestrator.has_pending_download());

    assert_eq!(h.orchestrator.on_destroy(), Some(topic.clone()));
    assert_eq!(handle.join().await, DownloadResolution::Abandoned);
    assert!(h.listener.calls().is_empty());
    assert!(!h.hub.is_bound(&topic));
    assert_eq!(h.orchestrator.state(), OrchestratorState::Idle);
}

#[tokio::test(start_paused = true)]
async fn slow_platform_times_out_when_bounded() {
    let h = harness_on(
        Arc::new(CompletionHub::new()),
        SimulatedPlatformConfig {
            script: CompletionScript::Complete {
                event: CompletionEvent::ok(),
                delay_ms: 10_000,
            },
            ..SimulatedPlatformConfig::default()
        },
        OrchestratorConfig::default().with_completion_timeout(Duration::from_secs(1)),
    );

    let handle = h.orchestrator.download_esim("ABC").unwrap();
    let topic = handle.topic().clone();
    assert_eq!(handle.join().await, DownloadResolution::TimedOut);
    assert!(h.listener.calls().is_empty());
    assert!(!h.orchestrator.has_pending_download());
    assert!(!h.hub.is_bound(&topic));
}

#[tokio::test]
async fn transport_failure_holds_the_registration_until_destroy() {
    let h = harness(SimulatedPlatformConfig {
        script: CompletionScript::TransportFailure {
            reason: "modem offline".to_string(),
        },
        ..SimulatedPlatformConfig::default()
    });

    let handle = h.orchestrator.download_esim("ABC").unwrap();
    let topic = handle.topic().clone();
    assert_eq!(handle.join().await, DownloadResolution::TransportFailed);
    assert!(h.listener.calls().is_empty());
    assert!(h.orchestrator.has_pending_download());
    assert!(matches!(
        h.orchestrator.download_esim("ABC"),
        Err(ProvisioningError::AlreadyRegistered { .. })
    ));

    assert_eq!(h.orchestrator.on_destroy(), Some(topic.clone()));
    assert!(!h.hub.is_bound(&topic));
    assert!(!h.orchestrator.has_pending_download());
}

#[tokio::test]
async fn late_completion_after_transport_failure_frees_the_orchestrator() {
    let h = harness(SimulatedPlatformConfig {
        script: CompletionScript::TransportFailure {
            reason: "modem offline".to_string(),
        },
        ..SimulatedPlatformConfig::default()
    });

    let handle = h.orchestrator.download_esim("ABC").unwrap();
    let topic = handle.topic().clone();
    assert_eq!(handle.join().await, DownloadResolution::TransportFailed);

    assert_eq!(
        h.hub.deliver(&topic, CompletionEvent::ok()),
        DeliveryStatus::Delivered
    );
    tokio::time::timeout(Duration::from_secs(5), async {
        while h.orchestrator.has_pending_download() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("late completion did not release the registration");

    assert!(h.listener.calls().is_empty());
    assert!(!h.hub.is_bound(&topic));
    let next = h.orchestrator.download_esim("NEXT").unwrap();
    assert_ne!(next.topic(), &topic);
    assert_eq!(next.join().await, DownloadResolution::TransportFailed);
    assert_eq!(h.platform.service.submissions().len(), 2);
}

#[tokio::test]
async fn sequential_downloads_use_fresh_topics() {
    let h = harness(SimulatedPlatformConfig::default());

    let first = h.orchestrator.download_esim("ABC").unwrap();
    let first_topic = first.topic().clone();
    first.join().await;
    let second = h.orchestrator.download_esim("DEF").unwrap();
    assert_ne!(second.topic(), &first_topic);
    second.join().await;

    assert_eq!(h.listener.calls().len(), 2);
    assert_eq!(h.platform.service.submissions().len(), 2);
}

#[tokio::test]
async fn orchestrators_sharing_a_hub_do_not_cross_deliver() {
    let hub = Arc::new(CompletionHub::new());
    let active = harness_on(
        hub.clone(),
        SimulatedPlatformConfig {
            script: CompletionScript::Complete {
                event: CompletionEvent::ok(),
                delay_ms: 20,
            },
            ..SimulatedPlatformConfig::default()
        },
        OrchestratorConfig::default(),
    );
    let failing = harness_on(
        hub.clone(),
        completing_with(CompletionEvent::new(result_code::ERROR, None)),
        OrchestratorConfig::default(),
    );

    let a = active.orchestrator.download_esim("ABC").unwrap();
    let b = failing.orchestrator.download_esim("DEF").unwrap();
    assert_eq!(hub.bound_count(), 2);

    let (a, b) = tokio::join!(a.join(), b.join());
    assert_eq!(a, DownloadResolution::Notified(OutcomeKind::ActiveSuccess));
    assert_eq!(b, DownloadResolution::Notified(OutcomeKind::Failure));
    assert_eq!(active.listener.calls().len(), 1);
    assert_eq!(failing.listener.calls().len(), 1);
    assert_eq!(hub.bound_count(), 0);
}
