use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::cancel::*;
use crate::Error;
use crate::TransportError;

#[tokio::test]
async fn test_cancellable_completes_when_not_cancelled() {
    let token = CancellationToken::new();
    assert_eq!(cancellable(&token, async { 7 }).await, Some(7));
}

#[tokio::test]
async fn test_cancellable_prefers_cancellation() {
    let token = CancellationToken::new();
    token.cancel();
    assert_eq!(cancellable(&token, async { 7 }).await, None);
}

#[tokio::test]
async fn test_run_scoped_returns_op_result() {
    let process = CancellationToken::new();
    let result = run_scoped(&process, &CallOptions::default(), |_| async { Ok(42) }).await;
    assert_eq!(result.unwrap(), 42);
}

#[tokio::test]
async fn test_run_scoped_maps_transport_error() {
    let process = CancellationToken::new();
    let result: crate::Result<()> = run_scoped(&process, &CallOptions::default(), |_| async {
        Err(TransportError::ConnectionLost("reset".into()))
    })
    .await;
    assert!(matches!(
        result,
        Err(Error::Transport(TransportError::ConnectionLost(_)))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_run_scoped_deadline_is_timeout() {
    let process = CancellationToken::new();
    let options = CallOptions::with_timeout(Duration::from_millis(100));

    let result: crate::Result<()> = run_scoped(&process, &options, |_| async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(())
    })
    .await;

    assert!(matches!(
        result,
        Err(Error::Transport(TransportError::Timeout(d))) if d == Duration::from_millis(100)
    ));
}

#[tokio::test]
async fn test_run_scoped_caller_cancel_is_canceled() {
    let process = CancellationToken::new();
    let caller = CancellationToken::new();
    let trigger = caller.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let result: crate::Result<()> = run_scoped(&process, &CallOptions::with_cancel(caller), |_| async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(())
    })
    .await;

    assert!(matches!(result, Err(Error::Canceled)));
    // Only this call is aborted
    assert!(!process.is_cancelled());
}

#[tokio::test]
async fn test_run_scoped_rejects_after_process_cancel() {
    let process = CancellationToken::new();
    process.cancel();

    let result = run_scoped(&process, &CallOptions::default(), |_| async { Ok(1) }).await;

    assert!(matches!(result, Err(Error::Canceled)));
}

#[tokio::test]
async fn test_run_scoped_process_cancel_wins_over_op_error() {
    let process = CancellationToken::new();
    let inner = process.clone();

    let result: crate::Result<()> = run_scoped(&process, &CallOptions::default(), |_| async move {
        inner.cancel();
        Err(TransportError::Closed)
    })
    .await;

    assert!(matches!(result, Err(Error::Canceled)));
}

#[tokio::test]
async fn test_run_scoped_cancels_scope_token_afterwards() {
    let process = CancellationToken::new();
    let (tx, rx) = tokio::sync::oneshot::channel();

    run_scoped(&process, &CallOptions::default(), |scope| async move {
        let _ = tx.send(scope);
        Ok(())
    })
    .await
    .unwrap();

    let scope = rx.await.unwrap();
    assert!(scope.is_cancelled());
    assert!(!process.is_cancelled());
}
