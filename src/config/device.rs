use serde::Deserialize;
use serde::Serialize;

use crate::ConnectionString;
use crate::Error;
use crate::Result;
use crate::TransportType;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DeviceSection {
    /// Protocol used for both registration and the session
    /// Default: mqtt
    #[serde(default)]
    pub transport: TransportType,

    /// Plug and Play model id announced at registration and session creation
    #[serde(default)]
    pub model_id: Option<String>,

    /// Pre-provisioned connection string; registration is skipped when set
    /// and no provisioning key is configured
    #[serde(default)]
    pub connection_string: Option<String>,
}

impl DeviceSection {
    pub fn validate(&self) -> Result<()> {
        if let Some(model_id) = &self.model_id {
            if model_id.trim().is_empty() {
                return Err(Error::InvalidConfig("device.model_id cannot be blank".into()));
            }
        }
        if let Some(cs) = self.connection_string() {
            cs.parse::<ConnectionString>()?;
        }
        Ok(())
    }

    /// Non-blank connection string, if any
    pub fn connection_string(&self) -> Option<&str> {
        self.connection_string.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Parent (edge) gateway the device connects through
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GatewayConfig {
    #[serde(default)]
    pub host_name: Option<String>,
}

impl GatewayConfig {
    pub fn host_name(&self) -> Option<&str> {
        self.host_name.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}
