use tokio_util::sync::CancellationToken;

use super::*;

fn registry() -> HandlerRegistry {
    HandlerRegistry::builder()
        .property("telemetryInterval", |value, _| async move { Ok(value) })
        .property("temperature", |value, _| async move { Ok(value) })
        .method("reboot", |_, _| async { Ok(MethodResponse::new(202, "{}")) })
        .method("factoryReset", |_, _| async {
            Err(HandlerError::Failed("not allowed".into()))
        })
        .build()
}

#[tokio::test]
async fn test_property_lookup_and_invoke() {
    let registry = registry();

    let handler = registry.property("telemetryInterval").unwrap();
    let reported = handler(PropertyValue::Integer(5000), CancellationToken::new()).await;

    assert_eq!(reported, Ok(PropertyValue::Integer(5000)));
    assert!(registry.property("unknown").is_none());
}

#[tokio::test]
async fn test_method_handlers_are_ordered_by_name() {
    let registry = registry();

    assert_eq!(registry.method_names(), vec!["factoryReset", "reboot"]);
    let (name, handler) = registry.methods().last().unwrap();
    assert_eq!(name, "reboot");
    assert_eq!(
        handler(Vec::new(), CancellationToken::new()).await,
        Ok(MethodResponse::new(202, "{}"))
    );
}

#[tokio::test]
async fn test_message_handler_is_optional() {
    assert!(registry().message_handler().is_none());

    let registry = HandlerRegistry::builder().message(|_| async { Ok(()) }).build();
    let handler = registry.message_handler().unwrap();
    assert!(handler("hello".to_string()).await.is_ok());
}

#[test]
fn test_duplicate_property_keeps_last_handler() {
    let registry = HandlerRegistry::builder()
        .property("p", |_, _| async { Ok(PropertyValue::Integer(1)) })
        .property("p", |_, _| async { Ok(PropertyValue::Integer(2)) })
        .build();

    assert_eq!(registry.property_names(), vec!["p"]);
}

#[test]
fn test_error_response_carries_message() {
    let response = MethodResponse::from_error(&HandlerError::Failed("boom".into()));

    assert_eq!(response.status, 500);
    let body: serde_json::Value = serde_json::from_str(&response.payload).unwrap();
    assert_eq!(body["error"], "Handler failed: boom");
}

#[test]
fn test_debug_lists_names_only() {
    let debug = format!("{:?}", registry());
    assert!(debug.contains("telemetryInterval"));
    assert!(debug.contains("reboot"));
}
