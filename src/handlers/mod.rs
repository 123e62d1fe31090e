//! Device-supplied capability tables.
//!
//! A [`HandlerRegistry`] is assembled once through [`HandlerRegistryBuilder`]
//! before the connect sequence starts and is read-only afterwards, so it is
//! shared behind an `Arc` without locking.

#[cfg(test)]
mod registry_test;

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::HandlerError;
use crate::PropertyValue;

/// Desired value in, reported value out
pub type PropertyHandler =
    Arc<dyn Fn(PropertyValue, CancellationToken) -> BoxFuture<'static, Result<PropertyValue, HandlerError>> + Send + Sync>;

/// Raw request payload in, acknowledgment out
pub type MethodHandler =
    Arc<dyn Fn(Vec<u8>, CancellationToken) -> BoxFuture<'static, Result<MethodResponse, HandlerError>> + Send + Sync>;

/// Decoded point-to-point message body
pub type MessageHandler = Arc<dyn Fn(String) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// Acknowledgment for a method invocation: numeric status plus JSON body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodResponse {
    pub status: i32,
    pub payload: String,
}

impl MethodResponse {
    pub fn new(
        status: i32,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            status,
            payload: payload.into(),
        }
    }

    /// Acknowledgment sent when the handler itself failed
    pub fn from_error(error: &HandlerError) -> Self {
        Self {
            status: 500,
            payload: serde_json::json!({ "error": error.to_string() }).to_string(),
        }
    }

    /// Acknowledgment for a method nobody registered
    pub fn not_found(name: &str) -> Self {
        Self {
            status: 404,
            payload: serde_json::json!({ "error": format!("method {name} is not implemented") }).to_string(),
        }
    }
}

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    properties: HashMap<String, PropertyHandler>,
    // Ordered so callbacks are installed deterministically
    methods: BTreeMap<String, MethodHandler>,
    message: Option<MessageHandler>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    pub fn property(
        &self,
        name: &str,
    ) -> Option<&PropertyHandler> {
        self.properties.get(name)
    }

    pub fn method(
        &self,
        name: &str,
    ) -> Option<&MethodHandler> {
        self.methods.get(name)
    }

    pub fn methods(&self) -> impl Iterator<Item = (&str, &MethodHandler)> {
        self.methods.iter().map(|(name, handler)| (name.as_str(), handler))
    }

    pub fn message_handler(&self) -> Option<&MessageHandler> {
        self.message.as_ref()
    }

    pub fn property_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.properties.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn method_names(&self) -> Vec<&str> {
        self.methods.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("properties", &self.property_names())
            .field("methods", &self.method_names())
            .field("message", &self.message.is_some())
            .finish()
    }
}

#[derive(Default)]
pub struct HandlerRegistryBuilder {
    registry: HandlerRegistry,
}

impl HandlerRegistryBuilder {
    /// Registers the update handler for one desired property.
    /// Registering the same name twice keeps the last handler.
    pub fn property<F, Fut>(
        mut self,
        name: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(PropertyValue, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PropertyValue, HandlerError>> + Send + 'static,
    {
        let name = name.into();
        let handler: PropertyHandler = Arc::new(move |value, token| handler(value, token).boxed());
        if self.registry.properties.insert(name.clone(), handler).is_some() {
            warn!(property = %name, "property handler registered twice, keeping the last one");
        }
        self
    }

    pub fn method<F, Fut>(
        mut self,
        name: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(Vec<u8>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<MethodResponse, HandlerError>> + Send + 'static,
    {
        let name = name.into();
        let handler: MethodHandler = Arc::new(move |payload, token| handler(payload, token).boxed());
        if self.registry.methods.insert(name.clone(), handler).is_some() {
            warn!(method = %name, "method handler registered twice, keeping the last one");
        }
        self
    }

    pub fn message<F, Fut>(
        mut self,
        handler: F,
    ) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.registry.message = Some(Arc::new(move |body| handler(body).boxed()));
        self
    }

    pub fn build(self) -> HandlerRegistry {
        self.registry
    }
}
