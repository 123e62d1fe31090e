//! Device registration boundary.
//!
//! Registration exchanges a [`DeviceIdentity`] for an [`Assignment`] (hub
//! endpoint plus final device id). The concrete provisioning transport lives
//! behind [`RegistrationClient`]; this module owns the checks that turn a raw
//! [`RegistrationResult`] into either an assignment or a fatal rejection.

#[cfg(test)]
mod provisioning_test;

use std::fmt;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::ConnectError;
use crate::ProvisioningError;
use crate::TransportType;

/// Who the device claims to be. Immutable once built; consumed by registration.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub registration_id: String,
    pub primary_key: String,
    pub secondary_key: Option<String>,
    /// Plug and Play model the device implements
    pub model_id: Option<String>,
    /// Parent gateway the device connects through
    pub gateway_host: Option<String>,
    /// Registration service the request goes to
    pub global_device_endpoint: Option<String>,
    /// Enrollment scope within that service
    pub id_scope: Option<String>,
}

impl DeviceIdentity {
    pub fn new(
        registration_id: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> Self {
        Self {
            registration_id: registration_id.into(),
            primary_key: primary_key.into(),
            secondary_key: None,
            model_id: None,
            gateway_host: None,
            global_device_endpoint: None,
            id_scope: None,
        }
    }

    pub fn with_id_scope(
        mut self,
        global_device_endpoint: impl Into<String>,
        id_scope: impl Into<String>,
    ) -> Self {
        self.global_device_endpoint = Some(global_device_endpoint.into());
        self.id_scope = Some(id_scope.into());
        self
    }

    pub fn with_model_id(
        mut self,
        model_id: impl Into<String>,
    ) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_gateway_host(
        mut self,
        host: impl Into<String>,
    ) -> Self {
        self.gateway_host = Some(host.into());
        self
    }

    /// Registration payload announcing the model id, if one is configured
    pub fn registration_payload(&self) -> Option<serde_json::Value> {
        self.model_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .map(|id| serde_json::json!({ "modelId": id }))
    }
}

// Keys stay out of logs
impl fmt::Debug for DeviceIdentity {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("registration_id", &self.registration_id)
            .field("global_device_endpoint", &self.global_device_endpoint)
            .field("id_scope", &self.id_scope)
            .field("model_id", &self.model_id)
            .field("gateway_host", &self.gateway_host)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationRequest {
    pub identity: DeviceIdentity,
    pub payload: Option<serde_json::Value>,
    /// Protocol the handshake must use; a client that cannot speak it
    /// answers [`ProvisioningError::UnsupportedTransport`]
    pub transport: TransportType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Unassigned,
    Assigning,
    Assigned,
    Failed,
    Disabled,
}

impl fmt::Display for RegistrationStatus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            RegistrationStatus::Unassigned => "unassigned",
            RegistrationStatus::Assigning => "assigning",
            RegistrationStatus::Assigned => "assigned",
            RegistrationStatus::Failed => "failed",
            RegistrationStatus::Disabled => "disabled",
        };
        f.write_str(s)
    }
}

/// Raw answer of the registration service
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationResult {
    pub status: RegistrationStatus,
    pub assigned_hub: Option<String>,
    pub device_id: Option<String>,
    pub error_code: Option<i32>,
    pub error_message: Option<String>,
}

impl RegistrationResult {
    pub fn assigned(
        hub: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            status: RegistrationStatus::Assigned,
            assigned_hub: Some(hub.into()),
            device_id: Some(device_id.into()),
            error_code: None,
            error_message: None,
        }
    }

    pub fn rejected(
        status: RegistrationStatus,
        code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            assigned_hub: None,
            device_id: None,
            error_code: Some(code),
            error_message: Some(message.into()),
        }
    }

    /// Turns the raw result into an [`Assignment`].
    ///
    /// Anything but `assigned` with a non-empty hub and device id is a fatal
    /// rejection.
    pub fn into_assignment(self) -> Result<Assignment, ConnectError> {
        if self.status != RegistrationStatus::Assigned {
            return Err(ConnectError::RegistrationRejected {
                status: self.status,
                code: self.error_code.unwrap_or_default(),
                message: self.error_message.unwrap_or_default(),
            });
        }

        let hub = self.assigned_hub.filter(|h| !h.trim().is_empty());
        let device_id = self.device_id.filter(|d| !d.trim().is_empty());
        match (hub, device_id) {
            (Some(hub), Some(device_id)) => Ok(Assignment { hub, device_id }),
            _ => Err(ConnectError::RegistrationRejected {
                status: self.status,
                code: self.error_code.unwrap_or_default(),
                message: "assignment is missing the hub or the device id".to_string(),
            }),
        }
    }
}

/// Result of a successful registration; created once, never mutated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub hub: String,
    pub device_id: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait RegistrationClient: Send + Sync + 'static {
    /// Performs the registration handshake.
    ///
    /// Implementations observe `cancel` and unwind promptly once it fires.
    async fn register(
        &self,
        request: RegistrationRequest,
        cancel: CancellationToken,
    ) -> Result<RegistrationResult, ProvisioningError>;
}
