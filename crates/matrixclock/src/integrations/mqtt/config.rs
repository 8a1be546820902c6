use std::time::Duration;

use serde::Deserialize;

fn default_port() -> u16 {
    1883
}

fn default_poll_delay_ms() -> u64 {
    100
}

fn default_advertise() -> bool {
    true
}

/// Configuration for the MQTT integration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Whether to connect to a broker at all
    #[serde(default)]
    pub enabled: bool,

    /// MQTT broker hostname or IP address
    #[serde(default)]
    pub broker: String,

    /// MQTT broker port
    #[serde(default = "default_port")]
    pub port: u16,

    /// MQTT client ID (default: the host name)
    pub client_id: Option<String>,

    /// Optional username for authentication
    pub username: Option<String>,

    /// Optional password for authentication
    pub password: Option<String>,

    /// Bounded wait for each pump of the connection, also used as the
    /// pause between pumps
    #[serde(default = "default_poll_delay_ms")]
    pub poll_delay_ms: u64,

    /// Advertise the device entities to Home Assistant
    #[serde(default = "default_advertise")]
    pub advertise: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: false,
            broker: String::new(),
            port: default_port(),
            client_id: None,
            username: None,
            password: None,
            poll_delay_ms: default_poll_delay_ms(),
            advertise: default_advertise(),
        }
    }
}

impl Config {
    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }

    /// The configured client ID, or the host name when unset.
    pub fn client_id(&self) -> String {
        self.client_id.clone().unwrap_or_else(|| {
            hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "matrixclock".to_string())
        })
    }
}
