//! In-process backend.
//!
//! [`SimulatedHub`] plays both the session factory and the session, and
//! [`SimulatedRegistrar`] plays the registration service. Tests and the demo
//! binary drive inbound traffic (desired patches, method invocations,
//! messages, status changes) from the backend side and inspect what the
//! device sent upward.

mod hub;
mod registrar;
pub use hub::*;
pub use registrar::*;


use futures::FutureExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Open/closed gate used to hold a phase until a test releases it
#[derive(Debug)]
pub(crate) struct Gate(watch::Sender<bool>);

impl Gate {
    pub(crate) fn open() -> Self {
        Self(watch::channel(true).0)
    }

    pub(crate) fn hold(&self) {
        self.0.send_replace(false);
    }

    pub(crate) fn release(&self) {
        self.0.send_replace(true);
    }

    /// `false` when `cancel` fired before the gate opened
    pub(crate) async fn pass(
        &self,
        cancel: &CancellationToken,
    ) -> bool {
        let mut rx = self.0.subscribe();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            opened = rx.wait_for(|open| *open).map(|r| r.is_ok()) => opened,
        }
    }
}
