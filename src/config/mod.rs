//! Layered device configuration.
//!
//! Sources are merged in order, later ones winning:
//! 1. Defaults from code
//! 2. File named by `CONFIG_PATH`
//! 3. Environment variables prefixed `IOT_DEVICE__`
//!    (e.g. `IOT_DEVICE__TELEMETRY__INTERVAL_MS=5000`)
mod device;
mod provisioning;
mod telemetry;
pub use device::*;
pub use provisioning::*;
pub use telemetry::*;


use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::ConnectionString;
use crate::DeviceIdentity;
use crate::Error;
use crate::Result;

const ENV_PREFIX: &str = "IOT_DEVICE";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DeviceConfig {
    /// Transport, model id and optional connection string
    #[serde(default)]
    pub device: DeviceSection,
    /// Symmetric-key registration
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
    /// Optional parent gateway
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Telemetry cadence of the reference device
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// How the device reaches its session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectMode {
    /// Register first, then connect to the assigned hub
    Provision(DeviceIdentity),
    /// Connect directly; registration is skipped
    Direct(ConnectionString),
}

impl DeviceConfig {
    /// Loads configuration from defaults, `CONFIG_PATH` and the environment.
    ///
    /// Does NOT validate; call [`DeviceConfig::validate`] once every override
    /// is applied.
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(environment());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Layers another file on top of the current values. Environment
    /// variables still take precedence.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and that exactly one way to connect exists.
    pub fn validate(self) -> Result<Self> {
        self.device.validate()?;
        self.provisioning.validate()?;
        self.telemetry.validate()?;
        self.connect_mode()?;
        Ok(self)
    }

    /// A configured primary key selects registration; otherwise the
    /// connection string is used.
    ///
    /// # Errors
    /// [`Error::InvalidConfig`] when neither is configured or the connection
    /// string is malformed.
    pub fn connect_mode(&self) -> Result<ConnectMode> {
        if self.provisioning.is_enabled() {
            let registration_id = non_blank(&self.provisioning.registration_id)
                .ok_or_else(|| Error::InvalidConfig("provisioning.registration_id is required".into()))?;
            let primary_key = non_blank(&self.provisioning.primary_key).unwrap_or_default();

            let id_scope = non_blank(&self.provisioning.id_scope)
                .ok_or_else(|| Error::InvalidConfig("provisioning.id_scope is required".into()))?;

            let mut identity = DeviceIdentity::new(registration_id, primary_key)
                .with_id_scope(self.provisioning.global_device_endpoint.trim(), id_scope);
            identity.secondary_key = non_blank(&self.provisioning.secondary_key).map(str::to_string);
            if let Some(model_id) = &self.device.model_id {
                identity = identity.with_model_id(model_id.clone());
            }
            if let Some(host) = self.gateway.host_name() {
                identity = identity.with_gateway_host(host);
            }
            return Ok(ConnectMode::Provision(identity));
        }

        match self.device.connection_string() {
            Some(cs) => {
                let mut cs: ConnectionString = cs.parse()?;
                if cs.gateway_host_name.is_none() {
                    cs.gateway_host_name = self.gateway.host_name().map(str::to_string);
                }
                Ok(ConnectMode::Direct(cs))
            }
            None => Err(Error::InvalidConfig(
                "either provisioning.primary_key or device.connection_string must be set".into(),
            )),
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
