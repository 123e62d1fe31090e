use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;

use super::Gate;
use crate::ConnectionStatus;
use crate::ConnectionStatusReason;
use crate::DesiredCallback;
use crate::InboundMessage;
use crate::MessageCallback;
use crate::MethodCallback;
use crate::MethodRequest;
use crate::MethodResponse;
use crate::OutboundMessage;
use crate::Session;
use crate::SessionFactory;
use crate::SessionOptions;
use crate::SessionResult;
use crate::SessionTarget;
use crate::StatusCallback;
use crate::TransportError;
use crate::TransportType;
use crate::TwinDocument;

/// Backend-side view of one device, shared by every clone.
///
/// Creating a session hands out the hub itself, so the device and the test
/// drive the same state.
#[derive(Clone, Default)]
pub struct SimulatedHub {
    inner: Arc<HubState>,
}

struct HubState {
    desired: RwLock<TwinDocument>,
    reported: RwLock<TwinDocument>,
    version: AtomicI64,
    reported_patches: Mutex<Vec<TwinDocument>>,
    events: Mutex<Vec<OutboundMessage>>,

    status_callback: RwLock<Option<StatusCallback>>,
    desired_callback: RwLock<Option<DesiredCallback>>,
    method_callbacks: DashMap<String, MethodCallback>,
    message_callback: RwLock<Option<MessageCallback>>,

    // lock token -> number of completions
    completions: DashMap<String, usize>,

    sessions: Mutex<Vec<(SessionTarget, SessionOptions)>>,
    journal: Mutex<Vec<String>>,
    unsupported: Mutex<Vec<TransportType>>,
    open_gate: Gate,
    open_failure: Mutex<Option<TransportError>>,
    send_failure: Mutex<Option<TransportError>>,
    send_latency: Mutex<Option<Duration>>,
    connected: AtomicBool,
    closed: AtomicBool,
}

impl Default for HubState {
    fn default() -> Self {
        Self {
            desired: RwLock::new(TwinDocument::new()),
            reported: RwLock::new(TwinDocument::new()),
            version: AtomicI64::new(1),
            reported_patches: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            status_callback: RwLock::new(None),
            desired_callback: RwLock::new(None),
            method_callbacks: DashMap::new(),
            message_callback: RwLock::new(None),
            completions: DashMap::new(),
            sessions: Mutex::new(Vec::new()),
            journal: Mutex::new(Vec::new()),
            unsupported: Mutex::new(Vec::new()),
            open_gate: Gate::open(),
            open_failure: Mutex::new(None),
            send_failure: Mutex::new(None),
            send_latency: Mutex::new(None),
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }
}

impl SimulatedHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub whose desired document starts as `desired`
    pub fn with_desired(desired: TwinDocument) -> Self {
        let hub = Self::new();
        *hub.inner.desired.write() = desired.with_version(1);
        hub
    }

    //-----------------------------------------------------------
    // Backend-side driving

    /// Merges `patch` into the desired document and pushes it to the device.
    /// Resolves once the device handled the patch.
    pub async fn push_desired_patch(
        &self,
        patch: TwinDocument,
    ) {
        let version = self.inner.version.fetch_add(1, Ordering::SeqCst) + 1;
        let patch = patch.with_version(version);
        self.inner.desired.write().merge(&patch);

        let callback = self.inner.desired_callback.read().clone();
        match callback {
            Some(callback) if self.is_connected() => callback(patch).await,
            _ => debug!(version, "desired patch stored, device not listening"),
        }
    }

    /// Invokes a direct method. Unknown methods are answered with 404 by the
    /// session layer itself.
    pub async fn invoke_method(
        &self,
        name: &str,
        payload: impl Into<Vec<u8>>,
    ) -> MethodResponse {
        let callback = self.inner.method_callbacks.get(name).map(|entry| entry.value().clone());
        match callback {
            Some(callback) => {
                callback(MethodRequest {
                    name: name.to_string(),
                    payload: payload.into(),
                })
                .await
            }
            None => MethodResponse::not_found(name),
        }
    }

    /// Delivers a point-to-point message and returns its lock token.
    pub async fn send_message(
        &self,
        body: impl Into<Vec<u8>>,
    ) -> String {
        let lock_token = nanoid::nanoid!();
        self.inner.completions.insert(lock_token.clone(), 0);

        let callback = self.inner.message_callback.read().clone();
        if let Some(callback) = callback {
            callback(InboundMessage {
                lock_token: lock_token.clone(),
                body: body.into(),
            })
            .await;
        }
        lock_token
    }

    /// Fires a connection status transition at the device.
    pub async fn set_status(
        &self,
        status: ConnectionStatus,
        reason: ConnectionStatusReason,
    ) {
        self.inner
            .connected
            .store(status == ConnectionStatus::Connected, Ordering::SeqCst);
        self.notify_status(status, reason).await;
    }

    /// Holds every `open` until [`SimulatedHub::release_open`]
    pub fn hold_open(&self) {
        self.inner.open_gate.hold();
    }

    pub fn release_open(&self) {
        self.inner.open_gate.release();
    }

    pub fn fail_open(
        &self,
        error: TransportError,
    ) {
        *self.inner.open_failure.lock() = Some(error);
    }

    /// Every following send fails with `error`
    pub fn fail_sends(
        &self,
        error: TransportError,
    ) {
        *self.inner.send_failure.lock() = Some(error);
    }

    pub fn set_send_latency(
        &self,
        latency: Duration,
    ) {
        *self.inner.send_latency.lock() = Some(latency);
    }

    /// Sessions for `transport` cannot be created
    pub fn reject_transport(
        &self,
        transport: TransportType,
    ) {
        self.inner.unsupported.lock().push(transport);
    }

    //-----------------------------------------------------------
    // Inspection

    pub fn desired(&self) -> TwinDocument {
        self.inner.desired.read().clone()
    }

    pub fn reported(&self) -> TwinDocument {
        self.inner.reported.read().clone()
    }

    /// Every reported patch in arrival order, empty ones included
    pub fn reported_patches(&self) -> Vec<TwinDocument> {
        self.inner.reported_patches.lock().clone()
    }

    pub fn events(&self) -> Vec<OutboundMessage> {
        self.inner.events.lock().clone()
    }

    pub fn sessions(&self) -> Vec<(SessionTarget, SessionOptions)> {
        self.inner.sessions.lock().clone()
    }

    /// Session operations in call order: `create`, `status_callback`,
    /// `desired_callback`, `method_callback:<name>`, `message_callback`,
    /// `open`, `close`
    pub fn journal(&self) -> Vec<String> {
        self.inner.journal.lock().clone()
    }

    pub fn completions(
        &self,
        lock_token: &str,
    ) -> usize {
        self.inner.completions.get(lock_token).map(|c| *c.value()).unwrap_or_default()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn record(
        &self,
        entry: impl Into<String>,
    ) {
        let entry = entry.into();
        trace!(%entry, "simulated hub call");
        self.inner.journal.lock().push(entry);
    }

    async fn notify_status(
        &self,
        status: ConnectionStatus,
        reason: ConnectionStatusReason,
    ) {
        let callback = self.inner.status_callback.read().clone();
        if let Some(callback) = callback {
            callback(status, reason).await;
        }
    }

    fn ensure_connected(&self) -> SessionResult<()> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if !self.is_connected() {
            return Err(TransportError::ConnectionLost("session is not connected".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionFactory for SimulatedHub {
    async fn create(
        &self,
        target: SessionTarget,
        options: SessionOptions,
    ) -> SessionResult<Arc<dyn Session>> {
        if self.inner.unsupported.lock().contains(&options.transport) {
            return Err(TransportError::Unsupported(options.transport));
        }
        debug!(hub = %target.hub(), device_id = %target.device_id(), "simulated session created");
        self.record("create");
        self.inner.sessions.lock().push((target, options));
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl Session for SimulatedHub {
    async fn open(
        &self,
        cancel: CancellationToken,
    ) -> SessionResult<()> {
        self.record("open");
        if !self.inner.open_gate.pass(&cancel).await {
            return Err(TransportError::ConnectionLost("open canceled".into()));
        }
        let failure = self.inner.open_failure.lock().clone();
        if let Some(e) = failure {
            return Err(e);
        }

        self.inner.connected.store(true, Ordering::SeqCst);
        self.notify_status(ConnectionStatus::Connected, ConnectionStatusReason::ConnectionOk)
            .await;
        Ok(())
    }

    async fn send_event(
        &self,
        message: OutboundMessage,
        cancel: CancellationToken,
    ) -> SessionResult<()> {
        self.ensure_connected()?;
        let latency = *self.inner.send_latency.lock();
        if let Some(latency) = latency {
            tokio::select! {
                _ = cancel.cancelled() => return Err(TransportError::Send("send canceled".into())),
                _ = tokio::time::sleep(latency) => {}
            }
        }
        let failure = self.inner.send_failure.lock().clone();
        if let Some(e) = failure {
            return Err(e);
        }
        self.inner.events.lock().push(message);
        Ok(())
    }

    async fn get_desired(
        &self,
        _cancel: CancellationToken,
    ) -> SessionResult<TwinDocument> {
        self.ensure_connected()?;
        Ok(self.desired())
    }

    async fn update_reported(
        &self,
        patch: TwinDocument,
        _cancel: CancellationToken,
    ) -> SessionResult<()> {
        self.ensure_connected()?;
        self.inner.reported.write().merge(&patch);
        self.inner.reported_patches.lock().push(patch);
        Ok(())
    }

    fn set_status_callback(
        &self,
        callback: StatusCallback,
    ) {
        self.record("status_callback");
        *self.inner.status_callback.write() = Some(callback);
    }

    async fn set_desired_callback(
        &self,
        callback: DesiredCallback,
    ) -> SessionResult<()> {
        self.record("desired_callback");
        *self.inner.desired_callback.write() = Some(callback);
        Ok(())
    }

    async fn set_method_callback(
        &self,
        name: String,
        callback: MethodCallback,
    ) -> SessionResult<()> {
        self.record(format!("method_callback:{name}"));
        self.inner.method_callbacks.insert(name, callback);
        Ok(())
    }

    async fn set_message_callback(
        &self,
        callback: MessageCallback,
    ) -> SessionResult<()> {
        self.record("message_callback");
        *self.inner.message_callback.write() = Some(callback);
        Ok(())
    }

    async fn complete_message(
        &self,
        lock_token: String,
        _cancel: CancellationToken,
    ) -> SessionResult<()> {
        match self.inner.completions.get_mut(&lock_token) {
            Some(mut count) => {
                *count += 1;
                Ok(())
            }
            None => Err(TransportError::Rejected {
                status: 404,
                message: format!("unknown lock token {lock_token}"),
            }),
        }
    }

    async fn close(&self) -> SessionResult<()> {
        self.record("close");
        self.inner.connected.store(false, Ordering::SeqCst);
        self.inner.closed.store(true, Ordering::SeqCst);
        // Callbacks capture device state; drop them with the session
        self.inner.status_callback.write().take();
        self.inner.desired_callback.write().take();
        self.inner.method_callbacks.clear();
        self.inner.message_callback.write().take();
        Ok(())
    }
}
