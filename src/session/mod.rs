//! Session boundary towards the management backend.
//!
//! The connectivity core never speaks a wire protocol itself. It consumes a
//! [`SessionFactory`] that turns an assignment (or a pre-provisioned
//! [`ConnectionString`]) into a live [`Session`], and a [`Session`] that can
//! open, send events, exchange twin documents and deliver inbound callbacks.
//!
//! Callbacks hand back futures; a session implementation awaits them, so the
//! work they trigger (resynchronization, method acknowledgment, message
//! completion) finishes before the session considers the event handled.

mod connection_string;
mod transport;

#[cfg(test)]
mod session_test;

pub use connection_string::*;
pub use transport::*;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
#[cfg(test)]
use mockall::automock;
use tokio_util::sync::CancellationToken;

use crate::Assignment;
use crate::MethodResponse;
use crate::TransportError;
use crate::TwinDocument;

pub type SessionResult<T> = std::result::Result<T, TransportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connected,
    DisconnectedRetrying,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatusReason {
    ConnectionOk,
    ExpiredSasToken,
    DeviceDisabled,
    BadCredential,
    RetryExpired,
    NoNetwork,
    CommunicationError,
    ClientClose,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for ConnectionStatusReason {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Device-to-cloud event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub message_id: String,
    pub body: Vec<u8>,
}

impl OutboundMessage {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            message_id: nanoid::nanoid!(),
            body: body.into(),
        }
    }
}

/// Cloud-to-device message awaiting completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Handle passed back to [`Session::complete_message`]
    pub lock_token: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRequest {
    pub name: String,
    pub payload: Vec<u8>,
}

pub type StatusCallback = Arc<dyn Fn(ConnectionStatus, ConnectionStatusReason) -> BoxFuture<'static, ()> + Send + Sync>;

/// Receives incremental desired-document patches
pub type DesiredCallback = Arc<dyn Fn(TwinDocument) -> BoxFuture<'static, ()> + Send + Sync>;

/// Returns the acknowledgment for one invocation
pub type MethodCallback = Arc<dyn Fn(MethodRequest) -> BoxFuture<'static, MethodResponse> + Send + Sync>;

pub type MessageCallback = Arc<dyn Fn(InboundMessage) -> BoxFuture<'static, ()> + Send + Sync>;

/// Shared access key authentication against an assigned hub
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKeyAuth {
    pub device_id: String,
    pub key: String,
}

impl fmt::Debug for SymmetricKeyAuth {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("SymmetricKeyAuth")
            .field("device_id", &self.device_id)
            .finish_non_exhaustive()
    }
}

/// Where a session connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTarget {
    /// Outcome of registration
    Assigned {
        assignment: Assignment,
        auth: SymmetricKeyAuth,
    },
    /// Registration skipped
    Provisioned(ConnectionString),
}

impl SessionTarget {
    pub fn device_id(&self) -> &str {
        match self {
            SessionTarget::Assigned { assignment, .. } => &assignment.device_id,
            SessionTarget::Provisioned(cs) => &cs.device_id,
        }
    }

    pub fn hub(&self) -> &str {
        match self {
            SessionTarget::Assigned { assignment, .. } => &assignment.hub,
            SessionTarget::Provisioned(cs) => &cs.host_name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub transport: TransportType,
    pub model_id: Option<String>,
    pub gateway_host: Option<String>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    /// Builds a session without connecting it.
    ///
    /// # Errors
    /// [`TransportError::Unsupported`] when the factory cannot speak
    /// `options.transport`.
    async fn create(
        &self,
        target: SessionTarget,
        options: SessionOptions,
    ) -> SessionResult<Arc<dyn Session>>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Session: Send + Sync + 'static {
    async fn open(
        &self,
        cancel: CancellationToken,
    ) -> SessionResult<()>;

    async fn send_event(
        &self,
        message: OutboundMessage,
        cancel: CancellationToken,
    ) -> SessionResult<()>;

    /// Full desired document as currently held by the backend
    async fn get_desired(
        &self,
        cancel: CancellationToken,
    ) -> SessionResult<TwinDocument>;

    async fn update_reported(
        &self,
        patch: TwinDocument,
        cancel: CancellationToken,
    ) -> SessionResult<()>;

    fn set_status_callback(
        &self,
        callback: StatusCallback,
    );

    async fn set_desired_callback(
        &self,
        callback: DesiredCallback,
    ) -> SessionResult<()>;

    async fn set_method_callback(
        &self,
        name: String,
        callback: MethodCallback,
    ) -> SessionResult<()>;

    async fn set_message_callback(
        &self,
        callback: MessageCallback,
    ) -> SessionResult<()>;

    /// Acknowledges an inbound message so the backend does not redeliver it
    async fn complete_message(
        &self,
        lock_token: String,
        cancel: CancellationToken,
    ) -> SessionResult<()>;

    async fn close(&self) -> SessionResult<()>;
}
