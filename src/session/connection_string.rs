use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::Error;

/// Pre-provisioned connection descriptor:
/// `HostName=..;DeviceId=..;SharedAccessKey=..[;GatewayHostName=..][;ModuleId=..]`
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub host_name: String,
    pub device_id: String,
    pub shared_access_key: String,
    pub gateway_host_name: Option<String>,
    pub module_id: Option<String>,
}

impl FromStr for ConnectionString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut host_name = None;
        let mut device_id = None;
        let mut shared_access_key = None;
        let mut gateway_host_name = None;
        let mut module_id = None;

        for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            // Keys are base64 and may themselves end with '='
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| Error::InvalidConfig(format!("malformed connection string segment {part:?}")))?;
            let value = value.trim().to_string();
            match key.trim() {
                "HostName" => host_name = Some(value),
                "DeviceId" => device_id = Some(value),
                "SharedAccessKey" => shared_access_key = Some(value),
                "GatewayHostName" => gateway_host_name = Some(value),
                "ModuleId" => module_id = Some(value),
                // Other credential kinds (SharedAccessSignature, x509) are not supported
                other => warn!(key = %other, "Ignoring unknown connection string key."),
            }
        }

        let required = |name: &str, value: Option<String>| {
            value
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::InvalidConfig(format!("connection string is missing {name}")))
        };

        Ok(Self {
            host_name: required("HostName", host_name)?,
            device_id: required("DeviceId", device_id)?,
            shared_access_key: required("SharedAccessKey", shared_access_key)?,
            gateway_host_name: gateway_host_name.filter(|v| !v.is_empty()),
            module_id: module_id.filter(|v| !v.is_empty()),
        })
    }
}

// The key stays out of logs
impl fmt::Debug for ConnectionString {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("host_name", &self.host_name)
            .field("device_id", &self.device_id)
            .field("gateway_host_name", &self.gateway_host_name)
            .field("module_id", &self.module_id)
            .finish_non_exhaustive()
    }
}
