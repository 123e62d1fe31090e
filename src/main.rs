use std::sync::Arc;

use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tracing::error;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use twinlink::ClimateDevice;
use twinlink::ConnectMode;
use twinlink::DeviceBuilder;
use twinlink::DeviceConfig;
use twinlink::Error;
use twinlink::Result;
use twinlink::SimulatedHub;
use twinlink::SimulatedRegistrar;
use twinlink::TwinDocument;
use twinlink::TELEMETRY_INTERVAL;

/// Host the simulated registrar assigns provisioned devices to
const SIMULATED_HUB: &str = "simulated-hub.local";

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    // Initializing Logs
    init_observability();

    let config = DeviceConfig::new()?.validate()?;
    let climate = ClimateDevice::new(&config.telemetry);

    // Simulated backend
    let hub = SimulatedHub::with_desired(TwinDocument::single(
        TELEMETRY_INTERVAL,
        config.telemetry.interval_ms as i64,
    ));
    let registration_id = match config.connect_mode()? {
        ConnectMode::Provision(identity) => identity.registration_id,
        ConnectMode::Direct(cs) => cs.device_id,
    };
    let registrar = SimulatedRegistrar::assigning(SIMULATED_HUB, registration_id);

    // Build Device
    let device = DeviceBuilder::from_config(&config)?
        .handlers(climate.handlers())
        .registration_client(Arc::new(registrar))
        .session_factory(Arc::new(hub))
        .start()?;

    info!("Device started. Waiting for CTRL+C signal...");
    let outcome = tokio::select! {
        result = climate.run(&device) => result,
        result = wait_for_shutdown_signal() => result,
    };
    if let Err(e) = &outcome {
        error!(error = %e, "Device stopped.");
    }

    device.shutdown().await?;
    println!("Exiting program.");
    outcome
}

async fn wait_for_shutdown_signal() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt()).map_err(|e| Error::Fatal(format!("SIGINT handler: {e}")))?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| Error::Fatal(format!("SIGTERM handler: {e}")))?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }
    Ok(())
}

fn init_observability() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(filter);
    tracing_subscriber::registry().with(base_subscriber).init();
}
