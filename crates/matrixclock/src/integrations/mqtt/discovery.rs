use std::fmt;

use serde_json::json;

use crate::store::EntityState;

/// Root of the Home Assistant discovery namespace
pub const HASS_TOPIC_PREFIX: &str = "homeassistant";

/// Kind of entity as understood by Home Assistant.
///
/// Topics name the class by its segment, e.g. `binary_sensor`. Segments
/// without a variant of their own are carried in [`DeviceClass::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Switch,
    Light,
    BinarySensor,
    Sensor,
    Other(String),
}

impl DeviceClass {
    /// Topic segment naming this class
    pub fn as_str(&self) -> &str {
        match self {
            DeviceClass::Switch => "switch",
            DeviceClass::Light => "light",
            DeviceClass::BinarySensor => "binary_sensor",
            DeviceClass::Sensor => "sensor",
            DeviceClass::Other(segment) => segment,
        }
    }
}

impl From<&str> for DeviceClass {
    fn from(segment: &str) -> Self {
        match segment {
            "switch" => DeviceClass::Switch,
            "light" => DeviceClass::Light,
            "binary_sensor" => DeviceClass::BinarySensor,
            "sensor" => DeviceClass::Sensor,
            other => DeviceClass::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three topics belonging to one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTopics {
    pub config: String,
    pub state: String,
    pub command: String,
}

impl EntityTopics {
    pub fn new(device_class: &DeviceClass, name: &str) -> Self {
        let prefix = format!("{HASS_TOPIC_PREFIX}/{device_class}/{name}");
        Self {
            config: format!("{prefix}/config"),
            state: format!("{prefix}/state"),
            command: format!("{prefix}/set"),
        }
    }
}

/// Segments of a topic inside the discovery namespace
///
/// Topic format: {prefix}/{device_class}/{name}/{suffix}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityTopic<'a> {
    pub device_class: &'a str,
    pub name: &'a str,
    pub suffix: &'a str,
}

/// Split a discovery-namespace topic into its segments.
///
/// Returns None for topics outside the namespace, with the wrong number of
/// segments, or with an empty class or name.
pub fn parse_entity_topic(topic: &str) -> Option<EntityTopic<'_>> {
    let rest = topic.strip_prefix(HASS_TOPIC_PREFIX)?.strip_prefix('/')?;
    let mut parts = rest.split('/');
    let (device_class, name, suffix) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || device_class.is_empty() || name.is_empty() {
        return None;
    }
    Some(EntityTopic {
        device_class,
        name,
        suffix,
    })
}

/// Build the retained config payload announcing an entity.
///
/// Caller `options` are laid over the generated fields and win on conflict.
pub fn discovery_payload(
    name: &str,
    device_class: &DeviceClass,
    options: &EntityState,
) -> EntityState {
    let topics = EntityTopics::new(device_class, name);
    let mut config = EntityState::new();
    config.insert("name".into(), json!(name));
    config.insert("unique_id".into(), json!(name));
    config.insert("device_class".into(), json!(device_class.as_str()));
    config.insert("schema".into(), json!("json"));
    config.insert("command_topic".into(), json!(topics.command));
    config.insert("state_topic".into(), json!(topics.state));
    config.extend(options.clone());
    config
}

/// Discovery options for a JSON-schema RGB light without brightness control
pub fn light_rgb_options() -> EntityState {
    let mut options = EntityState::new();
    options.insert("color_mode".into(), json!(true));
    options.insert("supported_color_modes".into(), json!(["rgb"]));
    options.insert("brightness".into(), json!(false));
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_topics() {
        let topics = EntityTopics::new(&DeviceClass::Switch, "d1");
        assert_eq!(topics.config, "homeassistant/switch/d1/config");
        assert_eq!(topics.state, "homeassistant/switch/d1/state");
        assert_eq!(topics.command, "homeassistant/switch/d1/set");
    }

    #[test]
    fn test_device_class_round_trips_through_topic_segment() {
        assert_eq!(DeviceClass::BinarySensor.to_string(), "binary_sensor");
        assert_eq!(DeviceClass::from("light"), DeviceClass::Light);
        assert_eq!(
            DeviceClass::from("toaster"),
            DeviceClass::Other("toaster".to_string())
        );
        assert_eq!(DeviceClass::from("toaster").to_string(), "toaster");
    }

    #[test]
    fn test_parse_entity_topic() {
        assert_eq!(
            parse_entity_topic("homeassistant/light/lamp/set"),
            Some(EntityTopic {
                device_class: "light",
                name: "lamp",
                suffix: "set",
            })
        );
    }

    #[test]
    fn test_parse_entity_topic_invalid() {
        assert_eq!(parse_entity_topic("some/other/topic"), None);
        assert_eq!(parse_entity_topic("homeassistant/light/lamp"), None);
        assert_eq!(parse_entity_topic("homeassistant/light/lamp/set/extra"), None);
        assert_eq!(parse_entity_topic("homeassistantx/light/lamp/set"), None);
        assert_eq!(parse_entity_topic("homeassistant/switch//set"), None);
        assert_eq!(parse_entity_topic("homeassistant//lamp/set"), None);
    }

    #[test]
    fn test_switch_discovery_payload() {
        let payload = discovery_payload("d1", &DeviceClass::Switch, &EntityState::new());
        let sorted: std::collections::BTreeMap<_, _> = payload.iter().collect();
        let text = serde_json::to_string_pretty(&sorted).unwrap();
        insta::assert_snapshot!(text, @r#"
        {
          "command_topic": "homeassistant/switch/d1/set",
          "device_class": "switch",
          "name": "d1",
          "schema": "json",
          "state_topic": "homeassistant/switch/d1/state",
          "unique_id": "d1"
        }
        "#);
    }

    #[test]
    fn test_options_override_generated_fields() {
        let mut options = light_rgb_options();
        options.insert("name".into(), json!("Date colour"));

        let payload = discovery_payload("rgb", &DeviceClass::Light, &options);

        assert_eq!(payload["name"], "Date colour");
        assert_eq!(payload["unique_id"], "rgb");
        assert_eq!(payload["supported_color_modes"], json!(["rgb"]));
        assert_eq!(payload["color_mode"], json!(true));
        assert_eq!(payload["brightness"], json!(false));
    }
}
