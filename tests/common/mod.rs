#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing_subscriber::EnvFilter;
use twinlink::ClimateDevice;
use twinlink::ConnectMode;
use twinlink::ConnectState;
use twinlink::DeviceBuilder;
use twinlink::DeviceClient;
use twinlink::DeviceIdentity;
use twinlink::SimulatedHub;
use twinlink::SimulatedRegistrar;
use twinlink::TelemetryConfig;
use twinlink::TwinDocument;

pub const MODEL_ID: &str = "dtmi:com:example:Thermostat;1";
pub const HUB: &str = "h1";
pub const DEVICE_ID: &str = "dev-1";

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for integration test.");
}

pub fn doc(value: serde_json::Value) -> TwinDocument {
    TwinDocument::from_json(value).unwrap()
}

/// Backend holding `{"telemetryInterval": 5000}` as the initial desired document
pub fn hub() -> SimulatedHub {
    SimulatedHub::with_desired(doc(json!({"telemetryInterval": 5000})))
}

pub fn registrar() -> Arc<SimulatedRegistrar> {
    Arc::new(SimulatedRegistrar::assigning(HUB, DEVICE_ID))
}

pub fn identity() -> DeviceIdentity {
    DeviceIdentity::new(DEVICE_ID, "k").with_model_id(MODEL_ID)
}

pub fn climate() -> ClimateDevice {
    ClimateDevice::new(&TelemetryConfig::default())
}

/// Starts a provisioned climate device against the simulated backend
pub fn start_device(
    climate: &ClimateDevice,
    hub: &SimulatedHub,
    registrar: &Arc<SimulatedRegistrar>,
) -> DeviceClient {
    DeviceBuilder::new(ConnectMode::Provision(identity()))
        .handlers(climate.handlers())
        .registration_client(registrar.clone())
        .session_factory(Arc::new(hub.clone()))
        .start()
        .unwrap()
}

/// Waits until the startup state machine reaches `state`
pub async fn reach(
    device: &DeviceClient,
    state: ConnectState,
) {
    let mut states = device.subscribe_state();
    tokio::time::timeout(Duration::from_secs(5), states.wait_for(|s| *s == state))
        .await
        .expect("state not reached in time")
        .expect("state channel closed");
}
