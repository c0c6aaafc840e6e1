mod config;

use clap::Parser;
use config::{Overrides, RunConfig};
use esim_adapters::{ListenerCall, RecordingListener, SimulatedPlatform};
use esim_core::{CompletionHub, DownloadResolution, ProvisioningError, ProvisioningOrchestrator};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "esimctl",
    version,
    about = "Drive one eSIM download against a simulated platform"
)]
struct Cli {
    /// Activation code handed to the provisioning service.
    activation_code: String,
    /// JSON file with `platform` and `orchestrator` sections.
    #[arg(long, env = "ESIM_CONFIG")]
    config: Option<PathBuf>,
    /// Simulate an app without carrier privileges.
    #[arg(long, default_value_t = false)]
    no_privileges: bool,
    /// Simulate a disabled provisioning service.
    #[arg(long, default_value_t = false)]
    service_disabled: bool,
    /// Platform API level; 29 and above activates inline.
    #[arg(long, env = "ESIM_API_LEVEL")]
    api_level: Option<u32>,
    /// Primary result code the platform reports (0 ok, 1 resolvable, 2 error).
    #[arg(long)]
    result_code: Option<i32>,
    /// Detail code attached to the completion event.
    #[arg(long)]
    detail_code: Option<i32>,
    /// Delay before the platform emits its completion event.
    #[arg(long)]
    delay_ms: Option<u64>,
    /// Accept the submission and never complete it.
    #[arg(long, default_value_t = false)]
    silent: bool,
    /// Fail the submission at the transport level with this reason.
    #[arg(long)]
    transport_failure: Option<String>,
    /// Give up waiting for completion after this many milliseconds.
    #[arg(long, env = "ESIM_COMPLETION_TIMEOUT_MS")]
    timeout_ms: Option<u64>,
    /// Do not ask the platform to switch to the new profile.
    #[arg(long, default_value_t = false)]
    no_switch: bool,
    /// Print the result as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            no_privileges: self.no_privileges,
            service_disabled: self.service_disabled,
            api_level: self.api_level,
            result_code: self.result_code,
            detail_code: self.detail_code,
            delay_ms: self.delay_ms,
            silent: self.silent,
            transport_failure: self.transport_failure.clone(),
            timeout_ms: self.timeout_ms,
            no_switch: self.no_switch,
        }
    }
}

fn resolution_name(resolution: DownloadResolution) -> &'static str {
    match resolution {
        DownloadResolution::Notified(kind) => kind.name(),
        DownloadResolution::TransportFailed => "transport_failed",
        DownloadResolution::TimedOut => "timed_out",
        DownloadResolution::Abandoned => "abandoned",
        DownloadResolution::Interrupted => "interrupted",
    }
}

fn rejection_name(err: &ProvisioningError) -> &'static str {
    match err {
        ProvisioningError::AuthorizationDenied => "authorization_denied",
        ProvisioningError::ServiceUnavailable => "service_unavailable",
        ProvisioningError::AlreadyRegistered { .. } => "already_registered",
        _ => "error",
    }
}

fn report(json_output: bool, resolution: &str, topic: Option<String>, call: Option<ListenerCall>) {
    if json_output {
        let listener = match &call {
            Some(ListenerCall::Success { message }) => {
                json!({ "callback": "on_success", "message": message })
            }
            Some(ListenerCall::Failure { message, profile }) => json!({
                "callback": "on_failure",
                "message": message,
                "profile": { "id": profile.id, "carrier_name": profile.carrier_name },
            }),
            None => serde_json::Value::Null,
        };
        println!(
            "{}",
            json!({ "resolution": resolution, "topic": topic, "listener": listener })
        );
        return;
    }

    println!("resolution: {resolution}");
    if let Some(topic) = topic {
        println!("topic:      {topic}");
    }
    match call {
        Some(ListenerCall::Success { message }) => println!("on_success: {message}"),
        Some(ListenerCall::Failure { message, profile }) => println!(
            "on_failure: {message} (profile {} / {})",
            profile.id, profile.carrier_name
        ),
        None => println!("listener:   not called"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "esimctl=info,esim_core=info,esim_adapters=info,warn".to_string()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let run = match &cli.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    }
    .apply(&cli.overrides());

    let hub = Arc::new(CompletionHub::new());
    let platform = SimulatedPlatform::build(&run.platform, hub)?;
    let listener = Arc::new(RecordingListener::new());
    let orchestrator =
        ProvisioningOrchestrator::init(listener.clone(), platform.bindings, run.orchestrator)?;

    let handle = match orchestrator.download_esim(&cli.activation_code) {
        Ok(handle) => handle,
        Err(err) if err.is_gate_rejection() => {
            info!(error = %err, "download rejected before submission");
            report(cli.json, rejection_name(&err), None, None);
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let topic = handle.topic().to_string();
    let resolution = handle.join().await;
    if orchestrator.on_destroy().is_some() {
        info!(topic = %topic, "released registration left by the download");
    }
    info!(
        resolution = resolution_name(resolution),
        submissions = platform.service.submissions().len(),
        "download finished"
    );

    report(
        cli.json,
        resolution_name(resolution),
        Some(topic),
        listener.last(),
    );
    Ok(())
}
