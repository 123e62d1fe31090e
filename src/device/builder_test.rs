use std::sync::Arc;

use super::*;
use crate::ConnectMode;
use crate::DeviceConfig;
use crate::DeviceIdentity;
use crate::Error;
use crate::MockSessionFactory;
use crate::TransportType;

const CONNECTION_STRING: &str = "HostName=h1;DeviceId=dev-1;SharedAccessKey=k;GatewayHostName=edge.local";

#[tokio::test]
async fn test_start_requires_session_factory() {
    let result = DeviceBuilder::new(ConnectMode::Direct(CONNECTION_STRING.parse().unwrap())).start();

    assert!(matches!(result, Err(Error::InvalidConfig(msg)) if msg.contains("session factory")));
}

#[tokio::test]
async fn test_provisioning_requires_registration_client() {
    let result = DeviceBuilder::new(ConnectMode::Provision(DeviceIdentity::new("dev-1", "k")))
        .session_factory(Arc::new(MockSessionFactory::new()))
        .start();

    assert!(matches!(result, Err(Error::InvalidConfig(msg)) if msg.contains("registration client")));
}

#[test]
fn test_direct_mode_carries_gateway_host() {
    let builder = DeviceBuilder::new(ConnectMode::Direct(CONNECTION_STRING.parse().unwrap()));

    assert_eq!(builder.options.gateway_host.as_deref(), Some("edge.local"));
    assert_eq!(builder.options.transport, TransportType::Mqtt);
    assert!(builder.options.model_id.is_none());
}

#[test]
fn test_provision_mode_carries_identity_options() {
    let identity = DeviceIdentity::new("dev-1", "k")
        .with_model_id("dtmi:com:example:Thermostat;1")
        .with_gateway_host("edge.local");

    let builder = DeviceBuilder::new(ConnectMode::Provision(identity)).transport(TransportType::AmqpTcpOnly);

    assert_eq!(builder.options.transport, TransportType::AmqpTcpOnly);
    assert_eq!(builder.options.model_id.as_deref(), Some("dtmi:com:example:Thermostat;1"));
    assert_eq!(builder.options.gateway_host.as_deref(), Some("edge.local"));
}

#[test]
fn test_from_config() {
    let mut config = DeviceConfig::default();
    config.device.connection_string = Some(CONNECTION_STRING.into());
    config.device.transport = TransportType::MqttWebsocketOnly;
    config.device.model_id = Some("dtmi:com:example:Thermostat;1".into());

    let builder = DeviceBuilder::from_config(&config).unwrap();

    assert!(matches!(&builder.mode, ConnectMode::Direct(cs) if cs.device_id == "dev-1"));
    assert_eq!(builder.options.transport, TransportType::MqttWebsocketOnly);
    assert_eq!(builder.options.model_id.as_deref(), Some("dtmi:com:example:Thermostat;1"));
}

#[test]
fn test_from_config_without_connect_mode_fails() {
    assert!(matches!(
        DeviceBuilder::from_config(&DeviceConfig::default()),
        Err(Error::InvalidConfig(_))
    ));
}
