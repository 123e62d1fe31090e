//! Fluent assembly of a [`DeviceClient`].
//!
//! Collaborators are injected explicitly; the handler tables are frozen when
//! [`DeviceBuilder::start`] spawns the connect sequence.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::connect::provisioned;
use super::connect::spawn_connect;
use super::connect::spawn_registration;
use super::connect::ConnectContext;
use super::ConnectState;
use super::DeviceClient;
use crate::ConnectMode;
use crate::DeviceConfig;
use crate::Error;
use crate::HandlerRegistry;
use crate::PropertyReconciler;
use crate::RegistrationClient;
use crate::Result;
use crate::SessionFactory;
use crate::SessionOptions;
use crate::SessionTarget;
use crate::TransportType;

pub struct DeviceBuilder {
    pub(super) mode: ConnectMode,
    pub(super) options: SessionOptions,
    pub(super) registry: HandlerRegistry,
    pub(super) registration_client: Option<Arc<dyn RegistrationClient>>,
    pub(super) session_factory: Option<Arc<dyn SessionFactory>>,
}

impl DeviceBuilder {
    pub fn new(mode: ConnectMode) -> Self {
        let options = match &mode {
            ConnectMode::Provision(identity) => SessionOptions {
                transport: TransportType::default(),
                model_id: identity.model_id.clone(),
                gateway_host: identity.gateway_host.clone(),
            },
            ConnectMode::Direct(cs) => SessionOptions {
                transport: TransportType::default(),
                model_id: None,
                gateway_host: cs.gateway_host_name.clone(),
            },
        };

        Self {
            mode,
            options,
            registry: HandlerRegistry::default(),
            registration_client: None,
            session_factory: None,
        }
    }

    /// Picks the connect mode, transport and model id from a loaded config.
    pub fn from_config(config: &DeviceConfig) -> Result<Self> {
        let mut builder = Self::new(config.connect_mode()?).transport(config.device.transport);
        if let Some(model_id) = &config.device.model_id {
            builder = builder.model_id(model_id.clone());
        }
        Ok(builder)
    }

    pub fn transport(
        mut self,
        transport: TransportType,
    ) -> Self {
        self.options.transport = transport;
        self
    }

    pub fn model_id(
        mut self,
        model_id: impl Into<String>,
    ) -> Self {
        self.options.model_id = Some(model_id.into());
        self
    }

    pub fn handlers(
        mut self,
        registry: HandlerRegistry,
    ) -> Self {
        self.registry = registry;
        self
    }

    pub fn registration_client(
        mut self,
        client: Arc<dyn RegistrationClient>,
    ) -> Self {
        self.registration_client = Some(client);
        self
    }

    pub fn session_factory(
        mut self,
        factory: Arc<dyn SessionFactory>,
    ) -> Self {
        self.session_factory = Some(factory);
        self
    }

    /// Spawns the connect sequence and returns immediately.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    /// [`Error::InvalidConfig`] when a required collaborator is missing.
    pub fn start(self) -> Result<DeviceClient> {
        let factory = self
            .session_factory
            .ok_or_else(|| Error::InvalidConfig("a session factory is required".into()))?;

        let shutdown = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(ConnectState::Init);
        let state = Arc::new(state_tx);

        let registration = match self.mode {
            ConnectMode::Provision(mut identity) => {
                let registrar = self.registration_client.ok_or_else(|| {
                    Error::InvalidConfig("a registration client is required to provision".into())
                })?;
                // The model id announced at registration matches the session's
                if identity.model_id.is_none() {
                    identity.model_id = self.options.model_id.clone();
                }
                spawn_registration(
                    registrar,
                    identity,
                    self.options.transport,
                    state.clone(),
                    shutdown.clone(),
                )
            }
            ConnectMode::Direct(cs) => {
                debug!(hub = %cs.host_name, device_id = %cs.device_id, "Registration skipped.");
                provisioned(SessionTarget::Provisioned(cs))
            }
        };

        let registry = Arc::new(self.registry);
        debug!(?registry, "Handler tables frozen.");

        let session = Arc::new(RwLock::new(None));
        let connect = spawn_connect(
            ConnectContext {
                factory,
                options: self.options,
                reconciler: Arc::new(PropertyReconciler::new(registry.clone())),
                registry,
                session: session.clone(),
                state,
                shutdown: shutdown.clone(),
            },
            registration.clone(),
        );

        Ok(DeviceClient::new(registration, connect, session, state_rx, shutdown))
    }
}
