mod error;
mod scheduler;
mod supervisor;
mod tick;

pub use error::RunOutcome;
pub use error::TaskError;
pub use scheduler::BrokerLink;
pub use scheduler::Device;
pub use scheduler::Scheduler;
pub use scheduler::SchedulerSettings;
pub use supervisor::RestartPolicy;
pub use supervisor::Supervisor;
pub use tick::VELOCITY_SHUFFLE_FRAMES;
pub use tick::tick;
