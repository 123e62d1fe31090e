//! Background connect sequence and the session callbacks it installs.

use std::sync::Arc;
use std::sync::Weak;

use futures::future::BoxFuture;
use futures::future::Shared;
use futures::FutureExt;
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::ConnectState;
use crate::utils::cancel::cancellable;
use crate::ConnectError;
use crate::ConnectionStatus;
use crate::ConnectionStatusReason;
use crate::DesiredCallback;
use crate::DeviceIdentity;
use crate::Error;
use crate::HandlerError;
use crate::HandlerRegistry;
use crate::InboundMessage;
use crate::MessageCallback;
use crate::MessageHandler;
use crate::MethodCallback;
use crate::MethodHandler;
use crate::MethodRequest;
use crate::MethodResponse;
use crate::PropertyReconciler;
use crate::ProvisioningError;
use crate::RegistrationClient;
use crate::RegistrationRequest;
use crate::Result;
use crate::Session;
use crate::SessionFactory;
use crate::SessionOptions;
use crate::SessionTarget;
use crate::StatusCallback;
use crate::SymmetricKeyAuth;
use crate::TransportError;
use crate::TransportType;
use crate::TwinDocument;

/// Outcome of the registration phase, shared by the connect sequence and disposal
pub(super) type RegistrationFuture = Shared<BoxFuture<'static, std::result::Result<SessionTarget, ConnectError>>>;

/// Outcome of the whole connect sequence, replayed to every awaiter
pub(super) type ConnectFuture = Shared<BoxFuture<'static, std::result::Result<(), ConnectError>>>;

pub(super) type SessionSlot = Arc<RwLock<Option<Arc<dyn Session>>>>;

pub(super) type StateSender = Arc<watch::Sender<ConnectState>>;

/// Everything the connect sequence needs, moved into the background task
pub(super) struct ConnectContext {
    pub(super) factory: Arc<dyn SessionFactory>,
    pub(super) options: SessionOptions,
    pub(super) registry: Arc<HandlerRegistry>,
    pub(super) reconciler: Arc<PropertyReconciler>,
    pub(super) session: SessionSlot,
    pub(super) state: StateSender,
    pub(super) shutdown: CancellationToken,
}

/// Turns a spawned phase into a cloneable outcome. A panicked or aborted task
/// becomes [`ConnectError::Aborted`].
fn shared_outcome<T>(
    handle: JoinHandle<std::result::Result<T, ConnectError>>
) -> Shared<BoxFuture<'static, std::result::Result<T, ConnectError>>>
where
    T: Clone + Send + Sync + 'static,
{
    handle
        .map(|joined| match joined {
            Ok(outcome) => outcome,
            Err(e) => Err(ConnectError::Aborted(e.to_string())),
        })
        .boxed()
        .shared()
}

/// Registration skipped: the target is known up front
pub(super) fn provisioned(target: SessionTarget) -> RegistrationFuture {
    futures::future::ready(Ok(target)).boxed().shared()
}

pub(super) fn spawn_registration(
    registrar: Arc<dyn RegistrationClient>,
    identity: DeviceIdentity,
    transport: TransportType,
    state: StateSender,
    shutdown: CancellationToken,
) -> RegistrationFuture {
    shared_outcome(tokio::spawn(async move {
        let outcome = register(registrar.as_ref(), identity, transport, &state, &shutdown).await;
        if let Err(e) = &outcome {
            state.send_replace(ConnectState::Failed);
            match e {
                ConnectError::Canceled => debug!("Registration canceled."),
                e => error!(error = %e, "Registration failed."),
            }
        }
        outcome
    }))
}

pub(super) fn spawn_connect(
    ctx: ConnectContext,
    registration: RegistrationFuture,
) -> ConnectFuture {
    shared_outcome(tokio::spawn(async move {
        let outcome = connect(&ctx, registration).await.map_err(|e| {
            // Cancellation wins over whatever the interrupted phase reported
            if ctx.shutdown.is_cancelled() {
                ConnectError::Canceled
            } else {
                e
            }
        });

        match &outcome {
            Ok(()) => {
                ctx.state.send_replace(ConnectState::Ready);
                info!("Device is ready.");
            }
            Err(ConnectError::Canceled) => {
                ctx.state.send_replace(ConnectState::Failed);
                debug!("Connect sequence canceled.");
            }
            Err(e) => {
                ctx.state.send_replace(ConnectState::Failed);
                error!(error = %e, "Connect sequence failed.");
            }
        }
        outcome
    }))
}

async fn register(
    registrar: &dyn RegistrationClient,
    identity: DeviceIdentity,
    transport: TransportType,
    state: &StateSender,
    shutdown: &CancellationToken,
) -> std::result::Result<SessionTarget, ConnectError> {
    state.send_replace(ConnectState::Registering);
    info!(
        registration_id = %identity.registration_id,
        id_scope = ?identity.id_scope,
        %transport,
        "Registering device."
    );

    let request = RegistrationRequest {
        payload: identity.registration_payload(),
        identity: identity.clone(),
        transport,
    };
    let result = cancellable(shutdown, registrar.register(request, shutdown.child_token()))
        .await
        .ok_or(ConnectError::Canceled)?
        .map_err(|e| match e {
            ProvisioningError::UnsupportedTransport(transport) => ConnectError::UnsupportedTransport(transport),
            e => ConnectError::Registration(e),
        })?;

    debug!(status = %result.status, "Registration answered.");
    let assignment = result.into_assignment()?;
    info!(hub = %assignment.hub, device_id = %assignment.device_id, "Device assigned.");

    Ok(SessionTarget::Assigned {
        auth: SymmetricKeyAuth {
            device_id: assignment.device_id.clone(),
            key: identity.primary_key,
        },
        assignment,
    })
}

async fn connect(
    ctx: &ConnectContext,
    registration: RegistrationFuture,
) -> std::result::Result<(), ConnectError> {
    let target = registration.await?;
    if ctx.shutdown.is_cancelled() {
        return Err(ConnectError::Canceled);
    }

    // 1. Create the session
    ctx.state.send_replace(ConnectState::SessionCreating);
    info!(
        hub = %target.hub(),
        device_id = %target.device_id(),
        transport = %ctx.options.transport,
        "Creating session."
    );
    let session = cancellable(&ctx.shutdown, ctx.factory.create(target, ctx.options.clone()))
        .await
        .ok_or(ConnectError::Canceled)?
        .map_err(|e| match e {
            TransportError::Unsupported(transport) => ConnectError::UnsupportedTransport(transport),
            e => ConnectError::SessionCreate(e),
        })?;
    *ctx.session.write() = Some(session.clone());

    // 2. Install callbacks; status first so the first "connected" is observed
    ctx.state.send_replace(ConnectState::HandlersInstalling);
    install_handlers(ctx, &session).await?;

    // 3. Open; the first full synchronization runs inside the status callback
    ctx.state.send_replace(ConnectState::SessionOpening);
    cancellable(&ctx.shutdown, session.open(ctx.shutdown.child_token()))
        .await
        .ok_or(ConnectError::Canceled)?
        .map_err(ConnectError::Open)?;

    Ok(())
}

async fn install_handlers(
    ctx: &ConnectContext,
    session: &Arc<dyn Session>,
) -> std::result::Result<(), ConnectError> {
    let weak = Arc::downgrade(session);

    session.set_status_callback(status_callback(
        ctx.reconciler.clone(),
        weak.clone(),
        ctx.shutdown.clone(),
    ));
    debug!("Installed connection status callback.");

    let desired = desired_callback(ctx.reconciler.clone(), weak.clone(), ctx.shutdown.clone());
    install(&ctx.shutdown, session.set_desired_callback(desired)).await?;
    debug!("Installed desired properties callback.");

    for (name, handler) in ctx.registry.methods() {
        let callback = method_callback(handler.clone(), ctx.shutdown.clone());
        install(&ctx.shutdown, session.set_method_callback(name.to_string(), callback)).await?;
        debug!(method = %name, "Installed method callback.");
    }

    let message = message_callback(ctx.registry.message_handler().cloned(), weak, ctx.shutdown.clone());
    install(&ctx.shutdown, session.set_message_callback(message)).await?;
    debug!("Installed message callback.");

    Ok(())
}

async fn install<F>(
    shutdown: &CancellationToken,
    fut: F,
) -> std::result::Result<(), ConnectError>
where
    F: std::future::Future<Output = std::result::Result<(), TransportError>>,
{
    cancellable(shutdown, fut)
        .await
        .ok_or(ConnectError::Canceled)?
        .map_err(ConnectError::HandlerInstall)
}

/// Every "connected" transition triggers a full resynchronization against the
/// backend's current desired document.
pub(super) fn status_callback(
    reconciler: Arc<PropertyReconciler>,
    session: Weak<dyn Session>,
    shutdown: CancellationToken,
) -> StatusCallback {
    Arc::new(move |status: ConnectionStatus, reason: ConnectionStatusReason| {
        let reconciler = reconciler.clone();
        let session = session.clone();
        let shutdown = shutdown.clone();
        async move {
            if status != ConnectionStatus::Connected {
                error!(%status, %reason, "Connection status changed.");
                return;
            }
            info!(%reason, "Connected, synchronizing desired properties.");

            let Some(session) = session.upgrade() else {
                debug!("Session released, skipping resynchronization.");
                return;
            };
            if let Err(e) = reconciler.resynchronize(session.as_ref(), &shutdown).await {
                log_sync_failure("Full resynchronization failed.", &e);
            }
        }
        .boxed()
    })
}

pub(super) fn desired_callback(
    reconciler: Arc<PropertyReconciler>,
    session: Weak<dyn Session>,
    shutdown: CancellationToken,
) -> DesiredCallback {
    Arc::new(move |patch: TwinDocument| {
        let reconciler = reconciler.clone();
        let session = session.clone();
        let shutdown = shutdown.clone();
        async move {
            debug!(version = ?patch.version(), keys = patch.len(), "Desired properties patch received.");
            let Some(session) = session.upgrade() else {
                debug!("Session released, dropping desired patch.");
                return;
            };
            if let Err(e) = reconciler.synchronize(session.as_ref(), &patch, &shutdown).await {
                log_sync_failure("Incremental synchronization failed.", &e);
            }
        }
        .boxed()
    })
}

fn log_sync_failure(
    msg: &str,
    e: &Error,
) {
    match e {
        Error::Canceled => debug!("{msg} Canceled."),
        e => warn!(error = %e, "{msg}"),
    }
}

/// A failing handler is answered with 500 and never reaches the session layer
pub(super) fn method_callback(
    handler: MethodHandler,
    shutdown: CancellationToken,
) -> MethodCallback {
    Arc::new(move |request: MethodRequest| {
        let handler = handler.clone();
        let shutdown = shutdown.clone();
        async move {
            debug!(method = %request.name, bytes = request.payload.len(), "Method invoked.");
            match cancellable(&shutdown, handler(request.payload, shutdown.clone())).await {
                Some(Ok(response)) => {
                    debug!(method = %request.name, status = response.status, "Method answered.");
                    response
                }
                Some(Err(e)) => {
                    warn!(method = %request.name, error = %e, "Method handler failed.");
                    MethodResponse::from_error(&e)
                }
                None => MethodResponse::from_error(&HandlerError::Failed("device is shutting down".into())),
            }
        }
        .boxed()
    })
}

/// Every inbound message is completed exactly once, whatever the handler does.
pub(super) fn message_callback(
    handler: Option<MessageHandler>,
    session: Weak<dyn Session>,
    shutdown: CancellationToken,
) -> MessageCallback {
    Arc::new(move |message: InboundMessage| {
        let handler = handler.clone();
        let session = session.clone();
        let shutdown = shutdown.clone();
        async move {
            let InboundMessage { lock_token, body } = message;
            debug!(%lock_token, bytes = body.len(), "Message received.");

            match (String::from_utf8(body), handler) {
                (Err(e), _) => warn!(%lock_token, error = %e, "Message body is not valid UTF-8."),
                (Ok(_), None) => debug!(%lock_token, "No message handler registered."),
                (Ok(text), Some(handler)) => match cancellable(&shutdown, handler(text)).await {
                    Some(Ok(())) => {}
                    Some(Err(e)) => warn!(%lock_token, error = %e, "Message handler failed."),
                    None => debug!(%lock_token, "Message handling canceled."),
                },
            }

            let Some(session) = session.upgrade() else {
                warn!(%lock_token, "Session released before message completion.");
                return;
            };
            if let Err(e) = session.complete_message(lock_token.clone(), shutdown.clone()).await {
                warn!(%lock_token, error = %e, "Failed to complete message.");
            }
        }
        .boxed()
    })
}
