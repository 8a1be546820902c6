use serde_json::json;

use super::discovery::DeviceClass;
use super::discovery::light_rgb_options;
use crate::store::EntityState;

/// An entity each run advertises once its broker task starts.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySpec {
    pub name: String,
    pub device_class: DeviceClass,
    pub options: EntityState,
    pub initial_state: Option<EntityState>,
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid MAC address '{0}': expected six colon-separated hex octets")]
pub struct MacAddressError(String);

/// Parse `aa:bb:cc:dd:ee:ff` (or dash-separated) into octets.
pub fn parse_mac(mac: &str) -> Result<[u8; 6], MacAddressError> {
    let err = || MacAddressError(mac.to_string());
    let mut octets = [0u8; 6];
    let mut parts = mac.trim().split([':', '-']);
    for octet in octets.iter_mut() {
        let part = parts.next().ok_or_else(err)?;
        if part.len() != 2 {
            return Err(err());
        }
        *octet = u8::from_str_radix(part, 16).map_err(|_| err())?;
    }
    if parts.next().is_some() {
        return Err(err());
    }
    Ok(octets)
}

/// Short device identifier: the low four bytes of the hardware address in hex.
pub fn host_id_from_mac(mac: &[u8; 6]) -> String {
    mac[2..].iter().map(|b| format!("{b:02x}")).collect()
}

/// Globally unique entity name, `<prefix>_<host_id>_<suffix>`.
pub fn build_entity_name(mqtt_prefix: &str, host_id: &str, suffix: &str) -> String {
    format!("{mqtt_prefix}_{host_id}_{suffix}")
}

/// The entities every device exposes: a power switch and the date colour light.
pub fn default_entities(mqtt_prefix: &str, host_id: &str) -> Vec<EntitySpec> {
    let state = |value: serde_json::Value| value.as_object().cloned();
    vec![
        EntitySpec {
            name: build_entity_name(mqtt_prefix, host_id, "power"),
            device_class: DeviceClass::Switch,
            options: EntityState::new(),
            initial_state: state(json!({"state": "ON"})),
        },
        EntitySpec {
            name: build_entity_name(mqtt_prefix, host_id, "date_rgb"),
            device_class: DeviceClass::Light,
            options: light_rgb_options(),
            initial_state: state(json!({
                "state": "ON",
                "color": 0x00ff00,
                "brightness": 255,
                "color_mode": "rgb",
            })),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mac() {
        assert_eq!(
            parse_mac("02:00:DE:ad:be:ef").unwrap(),
            [0x02, 0x00, 0xde, 0xad, 0xbe, 0xef]
        );
        assert_eq!(
            parse_mac("02-00-de-ad-be-ef").unwrap(),
            [0x02, 0x00, 0xde, 0xad, 0xbe, 0xef]
        );
    }

    #[test]
    fn test_parse_mac_invalid() {
        assert!(parse_mac("02:00:de:ad:be").is_err());
        assert!(parse_mac("02:00:de:ad:be:ef:01").is_err());
        assert!(parse_mac("02:00:de:ad:be:zz").is_err());
        assert!(parse_mac("2:00:de:ad:be:ef").is_err());
    }

    #[test]
    fn test_host_id_uses_low_four_bytes() {
        let mac = parse_mac("02:00:de:ad:be:ef").unwrap();
        assert_eq!(host_id_from_mac(&mac), "deadbeef");
    }

    #[test]
    fn test_default_entities() {
        let entities = default_entities("matrix", "deadbeef");
        assert_eq!(entities.len(), 2);

        assert_eq!(entities[0].name, "matrix_deadbeef_power");
        assert_eq!(entities[0].device_class, DeviceClass::Switch);
        assert_eq!(
            entities[0].initial_state.as_ref().unwrap()["state"],
            "ON"
        );

        let light = &entities[1];
        assert_eq!(light.name, "matrix_deadbeef_date_rgb");
        assert_eq!(light.device_class, DeviceClass::Light);
        assert_eq!(light.options, light_rgb_options());
        let initial = light.initial_state.as_ref().unwrap();
        assert_eq!(initial["color"], 65280);
        assert_eq!(initial["color_mode"], "rgb");
    }
}
