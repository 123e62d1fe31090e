use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Symmetric-key registration settings
#[derive(Serialize, Deserialize, Clone)]
pub struct ProvisioningConfig {
    /// Registration service endpoint
    /// Default: "global.azure-devices-provisioning.net"
    #[serde(default = "default_global_device_endpoint")]
    pub global_device_endpoint: String,

    #[serde(default)]
    pub id_scope: Option<String>,

    #[serde(default)]
    pub registration_id: Option<String>,

    /// Presence of this key selects registration over a connection string
    #[serde(default)]
    pub primary_key: Option<String>,

    #[serde(default)]
    pub secondary_key: Option<String>,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            global_device_endpoint: default_global_device_endpoint(),
            id_scope: None,
            registration_id: None,
            primary_key: None,
            secondary_key: None,
        }
    }
}

impl std::fmt::Debug for ProvisioningConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ProvisioningConfig")
            .field("global_device_endpoint", &self.global_device_endpoint)
            .field("id_scope", &self.id_scope)
            .field("registration_id", &self.registration_id)
            .finish_non_exhaustive()
    }
}

impl ProvisioningConfig {
    /// True when a primary key is configured
    pub fn is_enabled(&self) -> bool {
        non_blank(&self.primary_key).is_some()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        if self.global_device_endpoint.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "provisioning.global_device_endpoint cannot be empty".into(),
            ));
        }
        if non_blank(&self.id_scope).is_none() {
            return Err(Error::InvalidConfig(
                "provisioning.id_scope is required with a primary key".into(),
            ));
        }
        if non_blank(&self.registration_id).is_none() {
            return Err(Error::InvalidConfig(
                "provisioning.registration_id is required with a primary key".into(),
            ));
        }
        Ok(())
    }
}

pub(super) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn default_global_device_endpoint() -> String {
    "global.azure-devices-provisioning.net".to_string()
}
