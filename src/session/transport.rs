use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Wire protocol the registration client and the session speak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    #[default]
    Mqtt,
    MqttTcpOnly,
    #[serde(alias = "mqtt_web_socket_only")]
    MqttWebsocketOnly,
    Amqp,
    AmqpTcpOnly,
    #[serde(alias = "amqp_web_socket_only")]
    AmqpWebsocketOnly,
    Http1,
}

impl TransportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportType::Mqtt => "mqtt",
            TransportType::MqttTcpOnly => "mqtt_tcp_only",
            TransportType::MqttWebsocketOnly => "mqtt_websocket_only",
            TransportType::Amqp => "amqp",
            TransportType::AmqpTcpOnly => "amqp_tcp_only",
            TransportType::AmqpWebsocketOnly => "amqp_websocket_only",
            TransportType::Http1 => "http1",
        }
    }

    /// HTTP has no persistent channel, so no server-pushed callbacks
    pub fn supports_push(&self) -> bool {
        !matches!(self, TransportType::Http1)
    }
}

impl fmt::Display for TransportType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
