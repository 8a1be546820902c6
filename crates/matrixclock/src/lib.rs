pub mod config;
pub mod display;
pub mod engine;
pub mod input;
pub mod integrations;
pub mod store;

pub use config::Config;
pub use config::ConfigError;
pub use config::LogLevel;
pub use engine::RestartPolicy;
pub use engine::RunOutcome;
pub use engine::Scheduler;
pub use engine::Supervisor;
pub use store::Store;
