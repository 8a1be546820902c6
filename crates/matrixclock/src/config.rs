//! Configuration file parsing and structures.
//!
//! matrixclock reads one TOML file. Every section and field is optional; a
//! missing file section takes the defaults of the stock 64x32 board.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::Targets;

use crate::display::Bounds;
use crate::display::Point;
use crate::engine::RestartPolicy;
use crate::engine::SchedulerSettings;
pub use crate::integrations::mqtt::MqttConfig;
use crate::integrations::mqtt::parse_mac;

/// Top-level configuration structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub buttons: ButtonsConfig,
    #[serde(default)]
    pub time: TimeConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `"matrixclock::display" = "trace"`
    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

impl LoggingConfig {
    /// Filter passing `level` everywhere except where a target is overridden.
    pub fn targets(&self) -> Targets {
        self.overrides.iter().fold(
            Targets::new().with_default(LevelFilter::from(self.level)),
            |targets, (target, level)| targets.with_target(target.clone(), LevelFilter::from(*level)),
        )
    }
}

fn default_mqtt_prefix() -> String {
    "matrixclock".to_string()
}

/// Identity of this device
#[derive(Debug, Deserialize)]
pub struct DeviceConfig {
    /// First segment of every entity name
    #[serde(default = "default_mqtt_prefix")]
    pub mqtt_prefix: String,

    /// Hardware address used to derive the host id, `aa:bb:cc:dd:ee:ff`
    #[serde(default)]
    pub mac_address: Option<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            mqtt_prefix: default_mqtt_prefix(),
            mac_address: None,
        }
    }
}

/// Matrix geometry and animation timing
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: i32,
    pub height: i32,
    pub sprite_count: usize,
    pub sprite_size: i32,
    pub sprite_delay_ms: u64,
    pub clock_x: i32,
    pub clock_y: i32,
    pub clock_delay_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 32,
            sprite_count: 4,
            sprite_size: 16,
            sprite_delay_ms: 1,
            clock_x: 1,
            clock_y: 3,
            clock_delay_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Pause between two ticks
    pub loop_delay_ms: u64,

    /// What to do when a run faults: always (restart) or never
    pub restart: RestartPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            loop_delay_ms: 20,
            restart: RestartPolicy::Always,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ButtonsConfig {
    pub poll_delay_ms: u64,
}

impl Default for ButtonsConfig {
    fn default() -> Self {
        Self { poll_delay_ms: 10 }
    }
}

/// Network time synchronization
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    pub enabled: bool,

    /// Endpoint answering with the local time as plain text
    pub url: Option<String>,

    /// Seconds between two syncs
    pub interval_secs: u64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            interval_secs: 3600,
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check constraints spanning more than one field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time.enabled && self.time.url.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::Validation(
                "time.url is required when time.enabled is true".to_string(),
            ));
        }

        if self.mqtt.enabled && self.mqtt.broker.is_empty() {
            return Err(ConfigError::Validation(
                "mqtt.broker is required when mqtt.enabled is true".to_string(),
            ));
        }

        let display = &self.display;
        if display.sprite_size > display.width || display.sprite_size > display.height {
            return Err(ConfigError::Validation(format!(
                "display.sprite_size {} does not fit a {}x{} display",
                display.sprite_size, display.width, display.height
            )));
        }

        if let Some(mac) = &self.device.mac_address {
            parse_mac(mac).map_err(|e| ConfigError::Validation(format!("device.mac_address: {e}")))?;
        }

        Ok(())
    }

    /// Scheduler timing and geometry derived from this configuration
    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            bounds: Bounds {
                width: self.display.width,
                height: self.display.height,
                sprite_size: self.display.sprite_size,
            },
            sprite_count: self.display.sprite_count,
            sprite_delay: Duration::from_millis(self.display.sprite_delay_ms),
            clock_position: Point::new(self.display.clock_x, self.display.clock_y),
            clock_delay: Duration::from_millis(self.display.clock_delay_ms),
            loop_delay: Duration::from_millis(self.scheduler.loop_delay_ms),
            button_poll: Duration::from_millis(self.buttons.poll_delay_ms),
            ntp_interval: Duration::from_secs(self.time.interval_secs),
            broker_wait: self.mqtt.poll_delay(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();

        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.device.mqtt_prefix, "matrixclock");
        assert!(!config.time.enabled);
        assert!(!config.mqtt.enabled);
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.scheduler.restart, RestartPolicy::Always);

        let settings = config.scheduler_settings();
        assert_eq!(
            settings.bounds,
            Bounds {
                width: 64,
                height: 32,
                sprite_size: 16
            }
        );
        assert_eq!(settings.sprite_count, 4);
        assert_eq!(settings.clock_position, Point::new(1, 3));
        assert_eq!(settings.clock_delay, Duration::from_millis(500));
        assert_eq!(settings.sprite_delay, Duration::from_millis(1));
        assert_eq!(settings.broker_wait, Duration::from_millis(100));
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [logging]
            level = "debug"

            [logging.overrides]
            "matrixclock::display" = "trace"

            [device]
            mqtt_prefix = "hall"
            mac_address = "02:00:de:ad:be:ef"

            [display]
            width = 32
            height = 16
            sprite_count = 2
            sprite_size = 8

            [scheduler]
            loop_delay_ms = 50
            restart = "never"

            [buttons]
            poll_delay_ms = 25

            [time]
            enabled = true
            url = "http://time.example/api/ip"
            interval_secs = 600

            [mqtt]
            enabled = true
            broker = "broker.local"
            username = "clock"
            password = "hunter2"
            poll_delay_ms = 250
            advertise = false
        "#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(
            config.logging.overrides.get("matrixclock::display"),
            Some(&LogLevel::Trace)
        );
        assert_eq!(config.device.mqtt_prefix, "hall");
        assert_eq!(config.scheduler.restart, RestartPolicy::Never);
        assert_eq!(config.time.url.as_deref(), Some("http://time.example/api/ip"));
        assert_eq!(config.mqtt.broker, "broker.local");
        assert_eq!(config.mqtt.username.as_deref(), Some("clock"));
        assert!(!config.mqtt.advertise);

        let settings = config.scheduler_settings();
        assert_eq!(settings.bounds.max_x(), 24);
        assert_eq!(settings.bounds.max_y(), 8);
        assert_eq!(settings.loop_delay, Duration::from_millis(50));
        assert_eq!(settings.button_poll, Duration::from_millis(25));
        assert_eq!(settings.ntp_interval, Duration::from_secs(600));
        assert_eq!(settings.broker_wait, Duration::from_millis(250));
    }

    #[test]
    fn test_time_url_required_when_enabled() {
        let err = Config::parse(
            r#"
            [time]
            enabled = true
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("time.url"));
    }

    #[test]
    fn test_mqtt_broker_required_when_enabled() {
        let err = Config::parse(
            r#"
            [mqtt]
            enabled = true
            "#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("mqtt.broker"));
    }

    #[test]
    fn test_invalid_mac_address() {
        let err = Config::parse(
            r#"
            [device]
            mac_address = "not-a-mac"
            "#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("device.mac_address"));
    }

    #[test]
    fn test_sprite_must_fit_display() {
        let err = Config::parse(
            r#"
            [display]
            width = 8
            sprite_size = 16
            "#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("sprite_size"));
    }

    #[test]
    fn test_unknown_section_rejected() {
        let err = Config::parse(
            r#"
            [integrations]
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_invalid_log_level() {
        let err = Config::parse(
            r#"
            [logging]
            level = "verbose"
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_log_level_to_filter() {
        assert_eq!(LevelFilter::from(LogLevel::Trace), LevelFilter::TRACE);
        assert_eq!(LevelFilter::from(LogLevel::Warn), LevelFilter::WARN);
        assert!(LogLevel::Debug < LogLevel::Error);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[device]
mqtt_prefix = "kitchen"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.device.mqtt_prefix, "kitchen");
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let err = Config::from_file(&path).unwrap_err();
        let ConfigError::Io(reported, _) = err else {
            panic!("expected an I/O error, got {err:?}");
        };
        assert_eq!(reported, path);
    }
}
