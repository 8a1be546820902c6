pub mod mqtt;
pub mod time;
