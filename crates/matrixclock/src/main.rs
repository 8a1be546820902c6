use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use matrixclock::Config;
use matrixclock::RestartPolicy;
use matrixclock::RunOutcome;
use matrixclock::Scheduler;
use matrixclock::Supervisor;
use matrixclock::config::DeviceConfig;
use matrixclock::config::TimeConfig;
use matrixclock::display::TracingSurface;
use matrixclock::engine::BrokerLink;
use matrixclock::engine::Device;
use matrixclock::input::ChannelKeypad;
use matrixclock::input::KeyEvent;
use matrixclock::input::console_key_number;
use matrixclock::integrations::mqtt::host_id_from_mac;
use matrixclock::integrations::mqtt::parse_mac;
use matrixclock::integrations::time::NetworkTime;
use matrixclock::integrations::time::RealTimeClock;
use matrixclock::integrations::time::SoftwareRtc;
use matrixclock::integrations::time::ntp_update;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::info;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(version, about = "LED matrix clock with Home Assistant integration")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "matrixclock.toml")]
    config: PathBuf,

    /// Stop after the first fault instead of restarting
    #[arg(long)]
    no_restart: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(config.logging.targets())
        .init();

    info!("matrixclock starting");
    info!("Loaded config from: {}", args.config.display());

    let policy = if args.no_restart {
        RestartPolicy::Never
    } else {
        config.scheduler.restart
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, run(config, policy))
}

async fn run(config: Config, policy: RestartPolicy) -> anyhow::Result<()> {
    let settings = config.scheduler_settings();
    info!(
        "display: {}x{}, {} sprites of {}px every {:?}, clock every {:?}",
        settings.bounds.width,
        settings.bounds.height,
        settings.sprite_count,
        settings.bounds.sprite_size,
        settings.sprite_delay,
        settings.clock_delay
    );
    info!(
        "scheduler: tick every {:?}, buttons every {:?}, restart policy {:?}",
        settings.loop_delay, settings.button_poll, policy
    );

    let host_id = host_id(&config.device)?;
    info!("host id: {}", host_id);

    let rtc: Rc<dyn RealTimeClock> = Rc::new(SoftwareRtc::new());
    let time_source = time_source(&config.time)?;
    let mut time_synced = false;
    if let Some(source) = &time_source {
        info!(
            "time sync: {} every {:?}",
            config.time.url.as_deref().unwrap_or_default(),
            settings.ntp_interval
        );
        match ntp_update(&**source, &*rtc).await {
            Ok(()) => time_synced = true,
            Err(e) => warn!("initial time sync failed: {}", e),
        }
    }

    let (keypad, key_tx) = ChannelKeypad::new();
    tokio::task::spawn_local(console_buttons(key_tx));

    let device = Device {
        surface: Rc::new(TracingSurface),
        keypad: Rc::new(keypad),
        rtc,
        time_source,
        broker: broker_link(&config, &host_id),
    };
    let supervisor = Supervisor::new(Scheduler::new(device, settings), policy);
    if time_synced {
        supervisor.scheduler().mark_time_synced();
    }

    let stop = supervisor.scheduler().stop_handle();
    tokio::task::spawn_local(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                stop.notify_one();
            }
            Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
        }
    });

    match supervisor.run().await {
        RunOutcome::Completed => {
            info!("matrixclock shutdown complete");
            Ok(())
        }
        RunOutcome::Fault {
            task,
            reason,
            frame,
        } => Err(anyhow::anyhow!(
            "task {task} failed at frame {frame}: {reason}"
        )),
    }
}

/// Low four bytes of the configured MAC address, or the host name when no
/// address is configured.
fn host_id(device: &DeviceConfig) -> anyhow::Result<String> {
    if let Some(mac) = &device.mac_address {
        let mac = parse_mac(mac)?;
        return Ok(host_id_from_mac(&mac));
    }
    let name = hostname::get().context("Failed to read host name")?;
    Ok(name.to_string_lossy().into_owned())
}

/// Feed button presses typed on stdin to the keypad.
async fn console_buttons(tx: mpsc::UnboundedSender<KeyEvent>) {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Some(key_number) = console_key_number(&line) else {
            warn!("unknown button '{}', use u/up/0 or d/down/1", line.trim());
            continue;
        };
        for pressed in [true, false] {
            if tx.send(KeyEvent { key_number, pressed }).is_err() {
                return;
            }
        }
    }
}

#[cfg(feature = "integration_time")]
fn time_source(config: &TimeConfig) -> anyhow::Result<Option<Rc<dyn NetworkTime>>> {
    use matrixclock::integrations::time::HttpTimeSource;

    let Some(url) = config.url.as_deref().filter(|_| config.enabled) else {
        return Ok(None);
    };
    let source = HttpTimeSource::new(url).context("Failed to create HTTP time source")?;
    Ok(Some(Rc::new(source)))
}

#[cfg(not(feature = "integration_time"))]
fn time_source(config: &TimeConfig) -> anyhow::Result<Option<Rc<dyn NetworkTime>>> {
    if config.enabled {
        warn!("built without time sync support, ignoring [time]");
    }
    Ok(None)
}

#[cfg(feature = "integration_mqtt")]
fn broker_link(config: &Config, host_id: &str) -> Option<BrokerLink> {
    use matrixclock::integrations::mqtt::EventPump;
    use matrixclock::integrations::mqtt::RumqttcClient;
    use matrixclock::integrations::mqtt::default_entities;

    if !config.mqtt.enabled {
        return None;
    }

    let client_id = config.mqtt.client_id();
    info!(
        "MQTT broker: {}:{} as {}",
        config.mqtt.broker, config.mqtt.port, client_id
    );
    let (client, pump) = RumqttcClient::new(&config.mqtt, &client_id);
    let pump: Box<dyn EventPump> = Box::new(pump);
    let entities = if config.mqtt.advertise {
        default_entities(&config.device.mqtt_prefix, host_id)
    } else {
        Vec::new()
    };

    Some(BrokerLink {
        transport: Rc::new(client),
        pump: Rc::new(tokio::sync::Mutex::new(pump)),
        entities,
    })
}

#[cfg(not(feature = "integration_mqtt"))]
fn broker_link(config: &Config, _host_id: &str) -> Option<BrokerLink> {
    if config.mqtt.enabled {
        warn!("built without MQTT support, ignoring [mqtt]");
    }
    None
}
