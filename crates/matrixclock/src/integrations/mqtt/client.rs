use std::error::Error;
use std::time::Duration;

use async_trait::async_trait;

/// Delivery guarantee requested for a publish or subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// MQTT message received from a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

/// Something the broker connection reported while being pumped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    Connected { session_present: bool },
    Disconnected,
    Message(MqttMessage),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("MQTT request could not be queued: {0}")]
    Request(#[source] Box<dyn Error + Send>),

    #[error("MQTT connection failed: {0}")]
    Connection(#[source] Box<dyn Error + Send>),
}

/// Outbound half of the broker connection.
///
/// Calls only queue the request; the [`EventPump`] performs the I/O.
pub trait MqttTransport {
    /// Publish a message to an MQTT topic
    fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        retain: bool,
        qos: QoS,
    ) -> Result<(), TransportError>;

    /// Subscribe to an MQTT topic
    fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), TransportError>;
}

/// Inbound half of the broker connection.
#[async_trait(?Send)]
pub trait EventPump {
    /// Drive the connection for at most `wait`, returning what arrived.
    async fn pump(&mut self, wait: Duration) -> Result<Vec<BrokerEvent>, TransportError>;
}

/// Mock MQTT client for testing
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockMqttClient {
    pub published: std::cell::RefCell<Vec<(String, Vec<u8>, bool, QoS)>>,
    pub subscriptions: std::cell::RefCell<Vec<(String, QoS)>>,
    pub fail_publish: std::cell::Cell<bool>,
}

#[cfg(test)]
impl MockMqttClient {
    /// Create a new mock MQTT client
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload of every publish to `topic`, oldest first
    pub fn payloads(&self, topic: &str) -> Vec<String> {
        self.published
            .borrow()
            .iter()
            .filter(|(t, ..)| t == topic)
            .map(|(_, payload, ..)| String::from_utf8_lossy(payload).into_owned())
            .collect()
    }
}

#[cfg(test)]
impl MqttTransport for MockMqttClient {
    fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        retain: bool,
        qos: QoS,
    ) -> Result<(), TransportError> {
        if self.fail_publish.get() {
            return Err(TransportError::Request(Box::new(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "request queue full",
            ))));
        }
        self.published
            .borrow_mut()
            .push((topic.to_string(), payload.to_vec(), retain, qos));
        Ok(())
    }

    fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), TransportError> {
        self.subscriptions
            .borrow_mut()
            .push((topic.to_string(), qos));
        Ok(())
    }
}

/// Mock event pump replaying scripted batches, then staying quiet
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockEventPump {
    pub batches: std::collections::VecDeque<Result<Vec<BrokerEvent>, String>>,
    pub pumps: usize,
}

#[cfg(test)]
#[async_trait(?Send)]
impl EventPump for MockEventPump {
    async fn pump(&mut self, wait: Duration) -> Result<Vec<BrokerEvent>, TransportError> {
        self.pumps += 1;
        match self.batches.pop_front() {
            Some(Ok(events)) => Ok(events),
            Some(Err(e)) => Err(TransportError::Connection(Box::new(std::io::Error::other(e)))),
            None => {
                tokio::time::sleep(wait).await;
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(feature = "integration_mqtt")]
pub use self::rumqttc_client::RumqttcClient;
#[cfg(feature = "integration_mqtt")]
pub use self::rumqttc_client::RumqttcPump;

#[cfg(feature = "integration_mqtt")]
mod rumqttc_client {
    use rumqttc::AsyncClient;
    use rumqttc::Event;
    use rumqttc::EventLoop;
    use rumqttc::MqttOptions;
    use rumqttc::Packet;

    use super::*;
    use crate::integrations::mqtt::MqttConfig;

    /// Capacity of the request queue between the client and its event loop
    const REQUEST_CHANNEL_CAPACITY: usize = 32;

    impl From<QoS> for rumqttc::QoS {
        fn from(qos: QoS) -> Self {
            match qos {
                QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
                QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
                QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
            }
        }
    }

    /// Real MQTT client implementation using rumqttc
    pub struct RumqttcClient {
        client: AsyncClient,
    }

    /// Event loop of a [`RumqttcClient`]; connects lazily on the first pump
    pub struct RumqttcPump {
        event_loop: EventLoop,
    }

    impl RumqttcClient {
        /// Create a client and its event loop from configuration
        pub fn new(config: &MqttConfig, client_id: &str) -> (Self, RumqttcPump) {
            let mut mqtt_options = MqttOptions::new(client_id, config.broker.clone(), config.port);

            // Set keep-alive interval
            mqtt_options.set_keep_alive(Duration::from_secs(30));

            // Set credentials if provided
            if let (Some(username), Some(password)) = (&config.username, &config.password) {
                mqtt_options.set_credentials(username, password);
            }

            let (client, event_loop) = AsyncClient::new(mqtt_options, REQUEST_CHANNEL_CAPACITY);
            (Self { client }, RumqttcPump { event_loop })
        }
    }

    impl MqttTransport for RumqttcClient {
        fn publish(
            &self,
            topic: &str,
            payload: &[u8],
            retain: bool,
            qos: QoS,
        ) -> Result<(), TransportError> {
            self.client
                .try_publish(topic, qos.into(), retain, payload.to_vec())
                .map_err(|e| TransportError::Request(Box::new(e)))
        }

        fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), TransportError> {
            self.client
                .try_subscribe(topic, qos.into())
                .map_err(|e| TransportError::Request(Box::new(e)))
        }
    }

    #[async_trait(?Send)]
    impl EventPump for RumqttcPump {
        async fn pump(&mut self, wait: Duration) -> Result<Vec<BrokerEvent>, TransportError> {
            let deadline = tokio::time::Instant::now() + wait;
            let mut events = Vec::new();

            while let Ok(polled) = tokio::time::timeout_at(deadline, self.event_loop.poll()).await
            {
                match polled.map_err(|e| TransportError::Connection(Box::new(e)))? {
                    Event::Incoming(Packet::Publish(publish)) => {
                        events.push(BrokerEvent::Message(MqttMessage {
                            topic: publish.topic.to_string(),
                            payload: publish.payload.to_vec(),
                            retain: publish.retain,
                        }));
                    }
                    Event::Incoming(Packet::ConnAck(ack)) => {
                        events.push(BrokerEvent::Connected {
                            session_present: ack.session_present,
                        });
                    }
                    Event::Incoming(Packet::Disconnect) => {
                        events.push(BrokerEvent::Disconnected);
                    }
                    _ => {
                        // Ignore other events (suback, puback, pings, etc.)
                    }
                }
            }

            Ok(events)
        }
    }
}
