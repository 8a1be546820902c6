use std::cell::Cell;
use std::cell::RefCell;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;

use super::error::RunOutcome;
use super::error::TaskError;
use super::tick::tick;
use crate::display;
use crate::display::Animated;
use crate::display::Bounds;
use crate::display::ClockLabel;
use crate::display::Point;
use crate::display::Sprite;
use crate::display::Surface;
use crate::input::Keypad;
use crate::input::poll_buttons;
use crate::integrations::mqtt::Bridge;
use crate::integrations::mqtt::EntitySpec;
use crate::integrations::mqtt::EventPump;
use crate::integrations::mqtt::MqttTransport;
use crate::integrations::mqtt::poll_broker;
use crate::integrations::time::NetworkTime;
use crate::integrations::time::RealTimeClock;
use crate::integrations::time::ntp_poll;
use crate::store::Store;

/// Sprite sheet tile every sprite is drawn with
const SPRITE_TILE: u16 = 0;

/// What a spawned task reports when it ends: its name and its result.
type TaskResult = (String, Result<(), TaskError>);

/// Timing and geometry for one run.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub bounds: Bounds,
    pub sprite_count: usize,
    pub sprite_delay: Duration,
    pub clock_position: Point,
    pub clock_delay: Duration,
    /// Pause between two ticks
    pub loop_delay: Duration,
    pub button_poll: Duration,
    pub ntp_interval: Duration,
    /// Bounded wait of each broker pump, and the pause after it
    pub broker_wait: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            bounds: Bounds {
                width: 64,
                height: 32,
                sprite_size: 16,
            },
            sprite_count: 4,
            sprite_delay: Duration::from_millis(1),
            clock_position: Point::new(1, 3),
            clock_delay: Duration::from_millis(500),
            loop_delay: Duration::from_millis(20),
            button_poll: Duration::from_millis(10),
            ntp_interval: Duration::from_secs(3600),
            broker_wait: Duration::from_millis(100),
        }
    }
}

/// The broker connection shared by every run.
///
/// The pump outlives individual runs; a run holds its lock while polling.
pub struct BrokerLink {
    pub transport: Rc<dyn MqttTransport>,
    pub pump: Rc<tokio::sync::Mutex<Box<dyn EventPump>>>,
    /// Entities each run advertises from its broker task
    pub entities: Vec<EntitySpec>,
}

/// Hardware and network collaborators.
pub struct Device {
    pub surface: Rc<dyn Surface>,
    pub keypad: Rc<dyn Keypad>,
    pub rtc: Rc<dyn RealTimeClock>,
    pub time_source: Option<Rc<dyn NetworkTime>>,
    pub broker: Option<BrokerLink>,
}

/// Spawns the device tasks and drives the tick loop.
pub struct Scheduler {
    device: Device,
    settings: SchedulerSettings,
    stop: Rc<Notify>,
    frame: Cell<u32>,
    /// The clock was set just before the next run starts
    time_synced: Cell<bool>,
}

impl Scheduler {
    pub fn new(device: Device, settings: SchedulerSettings) -> Self {
        Self {
            device,
            settings,
            stop: Rc::new(Notify::new()),
            frame: Cell::new(0),
            time_synced: Cell::new(false),
        }
    }

    /// Record that the clock was just set, so the next run waits one
    /// interval before its first time sync.
    pub fn mark_time_synced(&self) {
        self.time_synced.set(true);
    }

    /// Handle that ends the current run with [`RunOutcome::Completed`].
    pub fn stop_handle(&self) -> Rc<Notify> {
        self.stop.clone()
    }

    /// Frame reached by the most recent run.
    pub fn frame(&self) -> u32 {
        self.frame.get()
    }

    /// One complete run: bootstrap a fresh store and task set, then tick
    /// until a task faults or a stop is requested.
    ///
    /// Must be called from within a [`tokio::task::LocalSet`].
    pub async fn main(&self) -> RunOutcome {
        info!("event loop started");
        let store = Store::shared();
        self.frame.set(0);
        let mut tasks: JoinSet<TaskResult> = JoinSet::new();

        // Bootstrapping
        let bridge = self.device.broker.as_ref().map(|broker| {
            let bridge = Bridge::new(broker.transport.clone(), store.clone());
            bridge.queue_advertisements(broker.entities.iter().cloned());
            (bridge, broker.pump.clone())
        });

        let keypad = self.device.keypad.clone();
        let button_store = store.clone();
        let button_poll = self.settings.button_poll;
        spawn(&mut tasks, "buttons", async move {
            poll_buttons(&*keypad, &button_store, button_poll)
                .await
                .map_err(TaskError::from)
        });

        if let Some((bridge, pump)) = bridge {
            let wait = self.settings.broker_wait;
            spawn(&mut tasks, "broker", async move {
                let mut pump = pump.lock().await;
                poll_broker(&mut **pump, &bridge, wait)
                    .await
                    .map_err(TaskError::from)
            });
        }

        if let Some(source) = &self.device.time_source {
            let source = source.clone();
            let rtc = self.device.rtc.clone();
            let interval = self.settings.ntp_interval;
            let synced = self.time_synced.replace(false);
            spawn(&mut tasks, "ntp", async move {
                if synced {
                    tokio::time::sleep(interval).await;
                }
                ntp_poll(&*source, &*rtc, interval)
                    .await
                    .map_err(TaskError::from)
            });
        }

        let clock = ClockLabel::new(
            self.device.surface.layer("clock"),
            self.device.rtc.clone(),
            self.settings.clock_position,
            self.settings.clock_delay,
        );
        spawn(
            &mut tasks,
            "clock",
            display::start(Rc::new(RefCell::new(clock))),
        );

        let mut rng = rand::rng();
        let sprites: Vec<Rc<RefCell<Sprite>>> = (0..self.settings.sprite_count)
            .map(|i| {
                let name = format!("sprite{i}");
                let layer = self.device.surface.layer(&name);
                Rc::new(RefCell::new(Sprite::random(
                    name,
                    layer,
                    SPRITE_TILE,
                    self.settings.bounds,
                    self.settings.sprite_delay,
                    &mut rng,
                )))
            })
            .collect();
        for sprite in &sprites {
            let name = sprite.borrow().name().to_string();
            spawn(&mut tasks, name, display::start(sprite.clone()));
        }
        debug!("spawned {} tasks", tasks.len());

        // Steady state
        loop {
            let ticked = std::panic::catch_unwind(AssertUnwindSafe(|| {
                tick(
                    &mut store.borrow_mut(),
                    &sprites,
                    &self.settings.bounds,
                    &mut rng,
                )
            }));
            match ticked {
                Ok(frame) => {
                    trace!("tick: frame={}", frame);
                    self.frame.set(frame);
                }
                Err(panic) => {
                    return self
                        .fault(&mut tasks, "tick", TaskError::from_panic(panic))
                        .await;
                }
            }

            if let Some(outcome) = self.pace(&mut tasks).await {
                return outcome;
            }
            tokio::task::yield_now().await;
        }
    }

    /// Wait out one pacing interval while watching the task set.
    ///
    /// Returns the run's outcome if a stop or a fault ends it meanwhile. A task
    /// that finishes cleanly does not cut the interval short.
    async fn pace(&self, tasks: &mut JoinSet<TaskResult>) -> Option<RunOutcome> {
        let deadline = Instant::now() + self.settings.loop_delay;
        loop {
            tokio::select! {
                biased;
                _ = self.stop.notified() => {
                    info!("stop requested at frame {}", self.frame.get());
                    tasks.shutdown().await;
                    return Some(RunOutcome::Completed);
                }
                Some(joined) = tasks.join_next() => match joined {
                    Ok((name, Ok(()))) => info!("task {} finished", name),
                    Ok((name, Err(reason))) => return Some(self.fault(tasks, &name, reason).await),
                    Err(e) => return Some(self.fault(tasks, "unknown", e.into()).await),
                },
                _ = tokio::time::sleep_until(deadline) => return None,
            }
        }
    }

    /// Tear down every remaining task so their resources are released, then
    /// report the fault.
    async fn fault(
        &self,
        tasks: &mut JoinSet<TaskResult>,
        task: &str,
        reason: TaskError,
    ) -> RunOutcome {
        error!("task {} failed: {}", task, reason);
        tasks.shutdown().await;
        RunOutcome::Fault {
            task: task.to_string(),
            reason,
            frame: self.frame.get(),
        }
    }
}

/// Spawn `task` on the current `LocalSet`, turning a panic into a
/// [`TaskError::Panicked`] labelled with `name`.
fn spawn<F>(tasks: &mut JoinSet<TaskResult>, name: impl Into<String>, task: F)
where
    F: Future<Output = Result<(), TaskError>> + 'static,
{
    let name = name.into();
    tasks.spawn_local(async move {
        let result = match AssertUnwindSafe(task).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(TaskError::from_panic(panic)),
        };
        (name, result)
    });
}
