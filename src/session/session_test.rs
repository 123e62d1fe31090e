use super::*;
use crate::Error;

#[test]
fn test_parse_connection_string() {
    let cs: ConnectionString = "HostName=h1.azure-devices.net;DeviceId=dev-1;SharedAccessKey=a2V5PQ=="
        .parse()
        .unwrap();

    assert_eq!(cs.host_name, "h1.azure-devices.net");
    assert_eq!(cs.device_id, "dev-1");
    // Trailing base64 padding survives the split on the first '='
    assert_eq!(cs.shared_access_key, "a2V5PQ==");
    assert_eq!(cs.gateway_host_name, None);
}

#[test]
fn test_parse_connection_string_with_gateway() {
    let cs: ConnectionString =
        "HostName=h1;DeviceId=dev-1;SharedAccessKey=k;GatewayHostName=edge.local;".parse().unwrap();

    assert_eq!(cs.gateway_host_name.as_deref(), Some("edge.local"));
    assert!(cs.module_id.is_none());
}

#[test]
fn test_connection_string_missing_key_is_config_error() {
    let result = "HostName=h1;DeviceId=dev-1".parse::<ConnectionString>();
    assert!(matches!(result, Err(Error::InvalidConfig(msg)) if msg.contains("SharedAccessKey")));
}

#[test]
fn test_connection_string_rejects_malformed_segments() {
    assert!("HostName".parse::<ConnectionString>().is_err());
    assert!("HostName=h1;DeviceId;SharedAccessKey=k".parse::<ConnectionString>().is_err());
}

#[test]
fn test_connection_string_ignores_unknown_keys() {
    let cs: ConnectionString = "HostName=h1;DeviceId=dev-1;SharedAccessKey=k;x509=true;\
         SharedAccessSignature=SharedAccessSignature sr=h1&sig=abc=&se=1"
        .parse()
        .unwrap();

    assert_eq!(cs.host_name, "h1");
    assert_eq!(cs.device_id, "dev-1");
    assert_eq!(cs.shared_access_key, "k");
    assert!(cs.gateway_host_name.is_none());
}

#[test]
fn test_connection_string_debug_hides_key() {
    let cs: ConnectionString = "HostName=h1;DeviceId=dev-1;SharedAccessKey=topsecret".parse().unwrap();
    assert!(!format!("{cs:?}").contains("topsecret"));
}

#[test]
fn test_transport_type_serde_names() {
    let t: TransportType = serde_json::from_str("\"mqtt_websocket_only\"").unwrap();
    assert_eq!(t, TransportType::MqttWebsocketOnly);
    let t: TransportType = serde_json::from_str("\"amqp_web_socket_only\"").unwrap();
    assert_eq!(t, TransportType::AmqpWebsocketOnly);
    assert_eq!(TransportType::Http1.to_string(), "http1");
    assert!(!TransportType::Http1.supports_push());
    assert!(TransportType::default().supports_push());
}

#[test]
fn test_session_target_accessors() {
    let target = SessionTarget::Assigned {
        assignment: Assignment {
            hub: "h1".into(),
            device_id: "dev-1".into(),
        },
        auth: SymmetricKeyAuth {
            device_id: "dev-1".into(),
            key: "k".into(),
        },
    };
    assert_eq!(target.hub(), "h1");
    assert_eq!(target.device_id(), "dev-1");
    assert!(!format!("{target:?}").contains("key: \"k\""));
}

#[test]
fn test_outbound_messages_get_distinct_ids() {
    let a = OutboundMessage::new("{}");
    let b = OutboundMessage::new("{}");
    assert_ne!(a.message_id, b.message_id);
    assert_eq!(a.body, b"{}".to_vec());
}
