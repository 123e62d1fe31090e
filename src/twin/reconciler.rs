use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::TwinDocument;
use crate::utils::cancel::cancellable;
use crate::Error;
use crate::HandlerError;
use crate::HandlerRegistry;
use crate::Result;
use crate::Session;

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Patch to push upward; may be empty
    pub reported: TwinDocument,
    /// Desired keys without a registered handler
    pub ignored: Vec<String>,
    /// Keys whose handler failed; excluded from `reported`
    pub failed: Vec<(String, HandlerError)>,
}

/// Translates desired documents into reported patches through the registered
/// property handlers.
///
/// Passes are serialized per device: a full resynchronization triggered by a
/// reconnect never interleaves with an incremental pass already in flight.
pub struct PropertyReconciler {
    registry: Arc<HandlerRegistry>,
    pass: Mutex<()>,
}

impl PropertyReconciler {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            pass: Mutex::new(()),
        }
    }

    /// Runs every registered handler once for the keys of `desired`.
    ///
    /// Unknown keys are skipped. A failing handler only drops its own key.
    ///
    /// # Errors
    /// [`Error::Canceled`] if `cancel` fires before the pass completes.
    pub async fn reconcile(
        &self,
        desired: &TwinDocument,
        cancel: &CancellationToken,
    ) -> Result<Reconciliation> {
        let _pass = cancellable(cancel, self.pass.lock()).await.ok_or(Error::Canceled)?;
        self.reconcile_locked(desired, cancel).await
    }

    /// Reconciles `desired` and pushes the resulting patch through `session`,
    /// even when the patch is empty.
    pub async fn synchronize(
        &self,
        session: &dyn Session,
        desired: &TwinDocument,
        cancel: &CancellationToken,
    ) -> Result<Reconciliation> {
        let _pass = cancellable(cancel, self.pass.lock()).await.ok_or(Error::Canceled)?;

        let outcome = self.reconcile_locked(desired, cancel).await?;
        self.push_locked(session, outcome, cancel).await
    }

    /// Fetches the full desired document and synchronizes it in one pass.
    ///
    /// The snapshot is read while the pass is held, so a patch processed
    /// before it can never be overwritten by older desired state.
    pub async fn resynchronize(
        &self,
        session: &dyn Session,
        cancel: &CancellationToken,
    ) -> Result<Reconciliation> {
        let _pass = cancellable(cancel, self.pass.lock()).await.ok_or(Error::Canceled)?;

        let desired = cancellable(cancel, session.get_desired(cancel.clone()))
            .await
            .ok_or(Error::Canceled)??;
        let outcome = self.reconcile_locked(&desired, cancel).await?;
        self.push_locked(session, outcome, cancel).await
    }

    async fn push_locked(
        &self,
        session: &dyn Session,
        outcome: Reconciliation,
        cancel: &CancellationToken,
    ) -> Result<Reconciliation> {
        debug!(
            reported = outcome.reported.len(),
            ignored = outcome.ignored.len(),
            failed = outcome.failed.len(),
            "Update reported properties."
        );
        cancellable(cancel, session.update_reported(outcome.reported.clone(), cancel.clone()))
            .await
            .ok_or(Error::Canceled)??;

        Ok(outcome)
    }

    async fn reconcile_locked(
        &self,
        desired: &TwinDocument,
        cancel: &CancellationToken,
    ) -> Result<Reconciliation> {
        debug!(version = ?desired.version(), keys = desired.len(), "Handling desired properties.");
        let mut outcome = Reconciliation::default();

        for (name, value) in desired {
            let Some(handler) = self.registry.property(name) else {
                trace!(property = %name, "no handler registered, skipping");
                outcome.ignored.push(name.clone());
                continue;
            };

            let result = cancellable(cancel, handler(value.clone(), cancel.clone()))
                .await
                .ok_or(Error::Canceled)?;

            match result {
                Ok(reported) => {
                    trace!(property = %name, desired = %value, reported = %reported, "property reconciled");
                    outcome.reported.insert(name.clone(), reported);
                }
                Err(e) => {
                    warn!(property = %name, desired = %value, error = %e, "property handler failed");
                    outcome.failed.push((name.clone(), e));
                }
            }
        }

        Ok(outcome)
    }
}
