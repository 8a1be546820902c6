mod bridge;
mod client;
mod config;
mod discovery;
mod entities;
mod poller;

pub use bridge::Bridge;
pub use bridge::BridgeError;
pub use bridge::BrokerCallbacks;
#[cfg(test)]
pub use client::MockEventPump;
#[cfg(test)]
pub use client::MockMqttClient;
pub use client::BrokerEvent;
pub use client::EventPump;
pub use client::MqttMessage;
pub use client::MqttTransport;
pub use client::QoS;
#[cfg(feature = "integration_mqtt")]
pub use client::RumqttcClient;
#[cfg(feature = "integration_mqtt")]
pub use client::RumqttcPump;
pub use client::TransportError;
pub use config::Config as MqttConfig;
pub use discovery::DeviceClass;
pub use discovery::EntityTopics;
pub use discovery::HASS_TOPIC_PREFIX;
pub use discovery::light_rgb_options;
pub use entities::EntitySpec;
pub use entities::MacAddressError;
pub use entities::build_entity_name;
pub use entities::default_entities;
pub use entities::host_id_from_mac;
pub use entities::parse_mac;
pub use poller::poll_broker;
