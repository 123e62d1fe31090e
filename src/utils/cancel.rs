//! Cancellation helpers shared by the connect sequence and the public calls.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::Error;
use crate::Result;
use crate::TransportError;

/// Caller-side scope for a single outbound call.
///
/// The effective scope is the intersection of the process-wide token, the
/// optional caller token and the optional deadline. Either side firing aborts
/// only this call.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl CallOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            cancel: None,
        }
    }

    pub fn with_cancel(token: CancellationToken) -> Self {
        Self {
            timeout: None,
            cancel: Some(token),
        }
    }

    pub fn timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Awaits `fut` unless `token` fires first; `None` means canceled.
pub(crate) async fn cancellable<F>(
    token: &CancellationToken,
    fut: F,
) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        output = fut => Some(output),
    }
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(d) => tokio::time::sleep(d).await,
        None => futures::future::pending::<()>().await,
    }
}

/// Runs `op` inside a scope linked to `process` and the caller's options.
///
/// `op` receives a child token of `process`; it is canceled when the call
/// ends, so a lingering operation never outlives its caller. Process
/// cancellation takes precedence over any other outcome.
pub(crate) async fn run_scoped<F, Fut, T>(
    process: &CancellationToken,
    options: &CallOptions,
    op: F,
) -> Result<T>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = std::result::Result<T, TransportError>>,
{
    if process.is_cancelled() {
        return Err(Error::Canceled);
    }

    let scope = process.child_token();
    let caller = options.cancel.clone().unwrap_or_else(CancellationToken::new);

    let outcome = tokio::select! {
        biased;
        _ = scope.cancelled() => Err(Error::Canceled),
        _ = caller.cancelled() => Err(Error::Canceled),
        _ = deadline(options.timeout) => Err(Error::Transport(TransportError::Timeout(
            options.timeout.unwrap_or_default(),
        ))),
        result = op(scope.clone()) => result.map_err(Error::from),
    };
    scope.cancel();

    match outcome {
        Err(_) if process.is_cancelled() => Err(Error::Canceled),
        other => other,
    }
}
