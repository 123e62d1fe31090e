//! Device Connectivity Error Hierarchy
//!
//! Defines the error types surfaced by the connectivity core, categorized by
//! the phase that produced them: startup (registration, session creation,
//! handler installation, session open), per-call transport operations, and
//! device-supplied handlers.

use std::time::Duration;

use config::ConfigError;

use crate::RegistrationStatus;
use crate::TransportType;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Fatal startup failure replayed from the background connect sequence
    #[error(transparent)]
    Connect(ConnectError),

    /// Per-call send/update failure; the session stays up
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Registration collaborator failure outside of the connect sequence
    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),

    /// Device-supplied handler failure
    #[error(transparent)]
    Handler(#[from] HandlerError),

    /// Configuration source or parsing failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration loaded but semantically invalid
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Process-wide cancellation fired, or the caller canceled the call
    #[error("Operation canceled")]
    Canceled,

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Terminal outcome of the background connect sequence.
///
/// Cloneable so the single outcome can be replayed to every awaiter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectError {
    /// Backend answered the registration with a status other than `assigned`
    #[error("Device registration failed with status {status}. Error {code}: {message}")]
    RegistrationRejected {
        status: RegistrationStatus,
        code: i32,
        message: String,
    },

    /// Registration client could not complete the handshake
    #[error("Device registration failed: {0}")]
    Registration(ProvisioningError),

    /// Neither the registration client nor the session factory speaks this transport
    #[error("Unsupported transport type {0}")]
    UnsupportedTransport(TransportType),

    #[error("Session creation failed: {0}")]
    SessionCreate(TransportError),

    #[error("Handler installation failed: {0}")]
    HandlerInstall(TransportError),

    #[error("Session open failed: {0}")]
    Open(TransportError),

    #[error("Connect sequence canceled")]
    Canceled,

    /// Background task panicked or was aborted before producing an outcome
    #[error("Connect sequence aborted: {0}")]
    Aborted(String),
}

impl From<ConnectError> for Error {
    fn from(e: ConnectError) -> Self {
        match e {
            ConnectError::Canceled => Error::Canceled,
            e => Error::Connect(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("Unsupported transport type {0}")]
    Unsupported(TransportType),

    /// Per-call deadline expired before the backend acknowledged
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Backend refused the request
    #[error("Request rejected with status {status}: {message}")]
    Rejected { status: i32, message: String },

    /// Session already released
    #[error("Session is closed")]
    Closed,

    #[error("Failed to send: {0}")]
    Send(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProvisioningError {
    #[error("Unsupported transport type {0}")]
    UnsupportedTransport(TransportType),

    #[error("Registration service unreachable: {0}")]
    Unreachable(String),

    #[error("Registration request rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HandlerError {
    /// Value variant does not match what the handler accepts
    #[error("Expected {expected} value but found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Handler failed: {0}")]
    Failed(String),
}
