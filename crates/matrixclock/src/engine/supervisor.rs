use std::cell::Cell;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde::Deserialize;
use tracing::error;
use tracing::info;

use super::error::RunOutcome;
use super::error::TaskError;
use super::scheduler::Scheduler;

/// What the supervisor does when a run faults.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestartPolicy {
    /// Start a fresh run, forever.
    #[default]
    Always,
    /// Hand the fault back to the caller.
    Never,
}

/// Outermost loop: runs the scheduler and restarts it from scratch after
/// every fault.
///
/// There is no backoff and no restart limit. A fault that repeats on every
/// run restarts at full speed.
pub struct Supervisor {
    scheduler: Scheduler,
    policy: RestartPolicy,
    restarts: Cell<u64>,
}

impl Supervisor {
    pub fn new(scheduler: Scheduler, policy: RestartPolicy) -> Self {
        Self {
            scheduler,
            policy,
            restarts: Cell::new(0),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Number of restarts so far.
    pub fn restarts(&self) -> u64 {
        self.restarts.get()
    }

    /// Run until stopped.
    ///
    /// Under [`RestartPolicy::Always`] this only returns
    /// [`RunOutcome::Completed`]. Must be called from within a
    /// [`tokio::task::LocalSet`].
    pub async fn run(&self) -> RunOutcome {
        info!("start event loop");
        loop {
            let outcome = match AssertUnwindSafe(self.scheduler.main())
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(panic) => RunOutcome::Fault {
                    task: "scheduler".to_string(),
                    reason: TaskError::from_panic(panic),
                    frame: self.scheduler.frame(),
                },
            };

            match outcome {
                RunOutcome::Completed => {
                    info!("event loop stopped");
                    return RunOutcome::Completed;
                }
                RunOutcome::Fault {
                    ref task,
                    ref reason,
                    frame,
                } => {
                    if self.policy == RestartPolicy::Never {
                        error!(
                            "event loop crashed: task={} frame={} reason={}, not restarting",
                            task, frame, reason
                        );
                        return outcome;
                    }
                    let restarts = self.restarts.get() + 1;
                    self.restarts.set(restarts);
                    error!(
                        "event loop crashed, restarting: task={} frame={} restarts={} reason={}",
                        task, frame, restarts, reason
                    );
                }
            }
            // A run can fault without ever suspending
            tokio::task::yield_now().await;
        }
    }
}
