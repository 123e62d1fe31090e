mod common;

use std::time::Duration;

use common::*;
use serde_json::json;
use twinlink::ConnectionStatus;
use twinlink::ConnectionStatusReason;
use twinlink::ConnectState;
use twinlink::MethodResponse;

#[tokio::test]
async fn test_desired_patch_is_clamped_and_reported() {
    enable_logger();
    let (hub, registrar, climate) = (hub(), registrar(), climate());
    let device = start_device(&climate, &hub, &registrar);
    device.wait_ready().await.unwrap();

    hub.push_desired_patch(doc(json!({"telemetryInterval": 10}))).await;

    let patches = hub.reported_patches();
    assert_eq!(patches.len(), 2);
    assert_eq!(patches[1].to_json(), json!({"telemetryInterval": 1000}));
    assert_eq!(climate.interval(), Duration::from_millis(1000));
    assert_eq!(hub.desired().version(), Some(2));

    device.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_patch_reports_only_handled_keys() {
    let (hub, registrar, climate) = (hub(), registrar(), climate());
    let device = start_device(&climate, &hub, &registrar);
    device.wait_ready().await.unwrap();

    let range = json!({"targetTemperatureRange": {"min": 18, "max": 24}});
    hub.push_desired_patch(doc(json!({"temperature": range, "fanSpeed": 3}))).await;
    hub.push_desired_patch(doc(json!({"fanSpeed": 4}))).await;

    let patches = hub.reported_patches();
    assert_eq!(patches.len(), 3);
    assert_eq!(patches[1].to_json(), json!({"temperature": range}));
    // Unknown keys still produce an (empty) update
    assert!(patches[2].is_empty());
    assert_eq!(
        hub.reported().to_json(),
        json!({"telemetryInterval": 5000, "temperature": range})
    );

    device.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failing_property_does_not_block_others() {
    let (hub, registrar, climate) = (hub(), registrar(), climate());
    let device = start_device(&climate, &hub, &registrar);
    device.wait_ready().await.unwrap();

    hub.push_desired_patch(doc(json!({"telemetryInterval": "soon", "temperature": 21}))).await;

    let last = hub.reported_patches().pop().unwrap();
    assert_eq!(last.to_json(), json!({"temperature": 21}));
    assert_eq!(climate.interval(), Duration::from_millis(5000));

    device.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reconnect_runs_full_resync() {
    let (hub, registrar, climate) = (hub(), registrar(), climate());
    let device = start_device(&climate, &hub, &registrar);
    device.wait_ready().await.unwrap();

    hub.set_status(ConnectionStatus::DisconnectedRetrying, ConnectionStatusReason::NoNetwork)
        .await;
    // Stored by the backend, not delivered while disconnected
    hub.push_desired_patch(doc(json!({"telemetryInterval": 7000}))).await;
    assert_eq!(hub.reported_patches().len(), 1);
    assert_eq!(climate.interval(), Duration::from_millis(5000));

    hub.set_status(ConnectionStatus::Connected, ConnectionStatusReason::ConnectionOk)
        .await;

    let patches = hub.reported_patches();
    assert_eq!(patches.len(), 2);
    assert_eq!(patches[1].to_json(), json!({"telemetryInterval": 7000}));
    assert_eq!(climate.interval(), Duration::from_millis(7000));
    assert_eq!(device.state(), ConnectState::Ready);

    device.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_resync_is_idempotent() {
    let (hub, registrar, climate) = (hub(), registrar(), climate());
    let device = start_device(&climate, &hub, &registrar);
    device.wait_ready().await.unwrap();

    hub.set_status(ConnectionStatus::Connected, ConnectionStatusReason::ConnectionOk)
        .await;
    hub.set_status(ConnectionStatus::Connected, ConnectionStatusReason::ConnectionOk)
        .await;

    let patches = hub.reported_patches();
    assert_eq!(patches.len(), 3);
    assert!(patches.iter().all(|p| p.to_json() == json!({"telemetryInterval": 5000})));

    device.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_methods_are_routed() {
    let (hub, registrar, climate) = (hub(), registrar(), climate());
    let device = start_device(&climate, &hub, &registrar);
    device.wait_ready().await.unwrap();

    assert_eq!(hub.invoke_method("reboot", Vec::new()).await, MethodResponse::new(202, "{}"));
    assert_eq!(hub.invoke_method("selfDestruct", Vec::new()).await.status, 404);

    device.shutdown().await.unwrap();
    // Callbacks are released with the session
    assert_eq!(hub.invoke_method("reboot", Vec::new()).await.status, 404);
}

#[tokio::test]
async fn test_messages_are_completed_once() {
    let (hub, registrar, climate) = (hub(), registrar(), climate());
    let device = start_device(&climate, &hub, &registrar);
    device.wait_ready().await.unwrap();

    let text = hub.send_message("hello").await;
    let binary = hub.send_message(vec![0xff, 0xfe]).await;

    assert_eq!(hub.completions(&text), 1);
    assert_eq!(hub.completions(&binary), 1);

    device.shutdown().await.unwrap();
}
