use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::connect::ConnectFuture;
use super::connect::RegistrationFuture;
use super::connect::SessionSlot;
use super::ConnectState;
use crate::utils::cancel::run_scoped;
use crate::CallOptions;
use crate::Error;
use crate::OutboundMessage;
use crate::PropertyValue;
use crate::Result;
use crate::Session;
use crate::TwinDocument;

/// Handle on one connected device.
///
/// Every outbound call first awaits the background connect sequence, so no
/// call ever observes a session that is not open yet. The session itself is
/// never handed out.
pub struct DeviceClient {
    registration: RegistrationFuture,
    connect: ConnectFuture,
    session: SessionSlot,
    state: watch::Receiver<ConnectState>,
    shutdown: CancellationToken,
    disposed: AtomicBool,
}

impl DeviceClient {
    pub(super) fn new(
        registration: RegistrationFuture,
        connect: ConnectFuture,
        session: SessionSlot,
        state: watch::Receiver<ConnectState>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registration,
            connect,
            session,
            state,
            shutdown,
            disposed: AtomicBool::new(false),
        }
    }

    /// Sends one telemetry event.
    ///
    /// Waits for the connect sequence first. `options` scopes the send itself:
    /// its deadline expiring yields [`TransportError::Timeout`], its token
    /// firing yields [`Error::Canceled`]; neither affects the session.
    ///
    /// [`TransportError::Timeout`]: crate::TransportError::Timeout
    pub async fn send_telemetry(
        &self,
        payload: impl Into<Vec<u8>>,
        options: CallOptions,
    ) -> Result<()> {
        let session = self.connected_session(options.cancel.as_ref()).await?;
        let message = OutboundMessage::new(payload);
        debug!(message_id = %message.message_id, bytes = message.body.len(), "Sending telemetry.");

        run_scoped(&self.shutdown, &options, |scope| async move {
            session.send_event(message, scope).await
        })
        .await
    }

    /// Reports a single property outside of reconciliation.
    pub async fn update_property(
        &self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Result<()> {
        let session = self.connected_session(None).await?;
        let patch = TwinDocument::single(name, value);
        debug!(keys = ?patch.keys().collect::<Vec<_>>(), "Updating reported property.");

        run_scoped(&self.shutdown, &CallOptions::default(), |scope| async move {
            session.update_reported(patch, scope).await
        })
        .await
    }

    /// Resolves once the connect sequence reached `Ready`, or replays its failure.
    pub async fn wait_ready(&self) -> Result<()> {
        self.connected_session(None).await.map(|_| ())
    }

    pub fn state(&self) -> ConnectState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectState> {
        self.state.clone()
    }

    /// Process-wide token; fires once when the device shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_shutdown(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Cancels every phase, waits for registration and the connect sequence
    /// to unwind, then closes the session if one was created.
    ///
    /// Safe before `Ready` and safe to call more than once; later calls are
    /// no-ops. Outbound calls made afterwards fail with [`Error::Canceled`].
    pub async fn shutdown(&self) -> Result<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            debug!("Device already shut down.");
            return Ok(());
        }
        info!(state = %self.state(), "Shutting down device.");

        // 1. Signal cancellation
        self.shutdown.cancel();

        // 2. Wait for registration, then for the full connect sequence
        if let Err(e) = self.registration.clone().await {
            debug!(error = %e, "Registration ended without assignment.");
        }
        if let Err(e) = self.connect.clone().await {
            debug!(error = %e, "Connect sequence ended without reaching ready.");
        }

        // 3. Release the session
        let session = self.session.write().take();
        if let Some(session) = session {
            if let Err(e) = session.close().await {
                warn!(error = %e, "Failed to close session.");
                return Err(e.into());
            }
            debug!("Session closed.");
        }

        info!("Device shut down.");
        Ok(())
    }

    /// Awaits the connect outcome; process or caller cancellation wins.
    async fn connected_session(
        &self,
        caller: Option<&CancellationToken>,
    ) -> Result<Arc<dyn Session>> {
        if self.shutdown.is_cancelled() {
            return Err(Error::Canceled);
        }
        let caller = caller.cloned().unwrap_or_else(CancellationToken::new);

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Err(Error::Canceled),
            _ = caller.cancelled() => return Err(Error::Canceled),
            outcome = self.connect.clone() => outcome?,
        }

        if self.shutdown.is_cancelled() {
            return Err(Error::Canceled);
        }
        self.session
            .read()
            .clone()
            .ok_or_else(|| Error::Fatal("connect sequence completed without a session".into()))
    }
}

impl Drop for DeviceClient {
    fn drop(&mut self) {
        // Unwinds the background sequence if shutdown was never awaited
        self.shutdown.cancel();
    }
}
