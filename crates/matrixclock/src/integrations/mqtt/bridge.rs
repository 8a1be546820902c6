use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;
use tracing::info;
use tracing::warn;

use super::client::MqttTransport;
use super::client::QoS;
use super::client::TransportError;
use super::discovery::DeviceClass;
use super::discovery::EntityTopics;
use super::discovery::discovery_payload;
use super::discovery::parse_entity_topic;
use super::entities::EntitySpec;
use crate::store::EntityState;
use crate::store::StoreHandle;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Failed to advertise entity {name}: {source}")]
    Advertise {
        name: String,
        #[source]
        source: TransportError,
    },

    #[error("Malformed payload on {topic}: {source}")]
    MalformedPayload {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Payload on {topic} is not a JSON object")]
    NotAnObject { topic: String },

    #[error("Switch {name} has no string 'state' field")]
    MissingSwitchState { name: String },

    #[error(transparent)]
    Connection(#[from] TransportError),
}

/// Callbacks the broker poller dispatches connection events to.
pub trait BrokerCallbacks {
    /// Called at the start of every pump cycle.
    fn before_pump(&self) -> Result<(), BridgeError> {
        Ok(())
    }

    fn on_connect(&self, session_present: bool);

    fn on_disconnect(&self);

    fn on_message(&self, topic: &str, payload: &[u8]) -> Result<(), BridgeError>;
}

/// Mirrors entity state between the store and Home Assistant.
pub struct Bridge {
    transport: Rc<dyn MqttTransport>,
    store: StoreHandle,
    /// Entities still waiting for their advertisement to be queued
    pending: RefCell<Vec<EntitySpec>>,
}

impl Bridge {
    pub fn new(transport: Rc<dyn MqttTransport>, store: StoreHandle) -> Self {
        Self {
            transport,
            store,
            pending: RefCell::new(Vec::new()),
        }
    }

    /// Queue entities to advertise on the next pump cycle.
    pub fn queue_advertisements(&self, entities: impl IntoIterator<Item = EntitySpec>) {
        self.pending.borrow_mut().extend(entities);
    }

    /// Number of entities not yet advertised.
    pub fn pending_advertisements(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Advertise every queued entity.
    ///
    /// An entity whose requests the transport rejects stays queued for the
    /// next cycle. While the broker is unreachable nothing drains the request
    /// queue, so a rejection is not a fault.
    pub fn advertise_pending(&self) -> Result<(), BridgeError> {
        let queued = self.pending.take();
        let mut deferred = Vec::new();
        for entity in queued {
            match self.advertise(&entity) {
                Ok(()) => {}
                Err(BridgeError::Advertise { name, source }) => {
                    warn!("deferring advertisement of {}: {}", name, source);
                    deferred.push(entity);
                }
                Err(e) => return Err(e),
            }
        }
        self.pending.borrow_mut().extend(deferred);
        Ok(())
    }

    /// Announce an entity and start listening for its commands.
    ///
    /// Re-advertising an existing name replaces its configuration.
    pub fn advertise_entity(
        &self,
        name: &str,
        device_class: &DeviceClass,
        options: &EntityState,
        initial_state: Option<EntityState>,
    ) -> Result<(), BridgeError> {
        let topics = EntityTopics::new(device_class, name);
        let config = discovery_payload(name, device_class, options);
        info!(
            "advertising hass entity: name={} config={}",
            name,
            serde_json::Value::Object(config.clone())
        );

        let advertise_err = |source| BridgeError::Advertise {
            name: name.to_string(),
            source,
        };
        let payload = serde_json::to_vec(&config).map_err(|source| BridgeError::MalformedPayload {
            topic: topics.config.clone(),
            source,
        })?;
        self.transport
            .publish(&topics.config, &payload, true, QoS::AtLeastOnce)
            .map_err(advertise_err)?;
        self.transport
            .subscribe(&topics.command, QoS::AtLeastOnce)
            .map_err(advertise_err)?;

        if let Some(state) = initial_state {
            self.update_entity_state(device_class, name, state)?;
        }
        Ok(())
    }

    /// Advertise a configured entity.
    pub fn advertise(&self, entity: &EntitySpec) -> Result<(), BridgeError> {
        self.advertise_entity(
            &entity.name,
            &entity.device_class,
            &entity.options,
            entity.initial_state.clone(),
        )
    }

    /// Replace an entity's state and publish it.
    ///
    /// Publish failures are logged and dropped; the store keeps the new state.
    pub fn update_entity_state(
        &self,
        device_class: &DeviceClass,
        name: &str,
        new_state: EntityState,
    ) -> Result<(), BridgeError> {
        info!(
            "updating hass entity state: device_class={} name={} state={}",
            device_class,
            name,
            serde_json::Value::Object(new_state.clone())
        );

        let payload = match device_class {
            DeviceClass::Switch => new_state
                .get("state")
                .and_then(|s| s.as_str())
                .map(|s| s.as_bytes().to_vec())
                .ok_or_else(|| BridgeError::MissingSwitchState {
                    name: name.to_string(),
                }),
            _ => serde_json::to_vec(&new_state).map_err(|source| BridgeError::MalformedPayload {
                topic: name.to_string(),
                source,
            }),
        };

        self.store.borrow_mut().set_entity(name, new_state);
        let payload = payload?;

        let topics = EntityTopics::new(device_class, name);
        if let Err(e) = self
            .transport
            .publish(&topics.state, &payload, true, QoS::AtLeastOnce)
        {
            warn!("failed to publish state of {}: {}", name, e);
        }
        Ok(())
    }

    /// Apply an inbound broker message.
    ///
    /// Only `<prefix>/<class>/<name>/set` topics change anything. A switch
    /// treats anything other than `ON` as `OFF`. Every other class, known or
    /// not, takes the payload as a JSON object and stores it verbatim.
    pub fn process_message(&self, topic: &str, message: &[u8]) -> Result<(), BridgeError> {
        let Some(parsed) = parse_entity_topic(topic) else {
            debug!("ignoring message outside discovery namespace: {}", topic);
            return Ok(());
        };
        if parsed.suffix != "set" {
            return Ok(());
        }
        let device_class = DeviceClass::from(parsed.device_class);

        let new_state = match device_class {
            DeviceClass::Switch => {
                let state = if message == b"ON" { "ON" } else { "OFF" };
                let mut record = EntityState::new();
                record.insert("state".into(), state.into());
                record
            }
            _ => {
                let value: serde_json::Value = serde_json::from_slice(message).map_err(|source| {
                    BridgeError::MalformedPayload {
                        topic: topic.to_string(),
                        source,
                    }
                })?;
                match value {
                    serde_json::Value::Object(record) => record,
                    _ => {
                        return Err(BridgeError::NotAnObject {
                            topic: topic.to_string(),
                        });
                    }
                }
            }
        };

        self.update_entity_state(&device_class, parsed.name, new_state)
    }
}

impl BrokerCallbacks for Bridge {
    fn before_pump(&self) -> Result<(), BridgeError> {
        self.advertise_pending()
    }

    fn on_connect(&self, session_present: bool) {
        info!("MQTT > Connected: session_present={}", session_present);
    }

    fn on_disconnect(&self) {
        info!("MQTT > Disconnected");
    }

    fn on_message(&self, topic: &str, payload: &[u8]) -> Result<(), BridgeError> {
        debug!(
            "MQTT > Message: Topic={} | Message={}",
            topic,
            String::from_utf8_lossy(payload)
        );
        self.process_message(topic, payload)
    }
}
