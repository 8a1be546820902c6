use std::any::Any;

use crate::input::InputError;
use crate::integrations::mqtt::BridgeError;
use crate::integrations::time::TimeError;

/// Why a run of the scheduler ended.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("broker: {0}")]
    Bridge(#[from] BridgeError),

    #[error("time sync: {0}")]
    Time(#[from] TimeError),

    #[error("buttons: {0}")]
    Input(#[from] InputError),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error("task could not be joined: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl TaskError {
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        Self::Panicked(message)
    }
}

/// Result of one pass through [`Scheduler::main`](super::Scheduler::main).
#[derive(Debug)]
pub enum RunOutcome {
    /// Every task returned without error.
    Completed,

    /// A task failed or panicked; the run was torn down at `frame`.
    Fault {
        task: String,
        reason: TaskError,
        frame: u32,
    },
}
