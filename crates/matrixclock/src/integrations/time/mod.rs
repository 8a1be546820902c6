//! Wall-clock time: the network time source, the real-time clock and the
//! periodic sync task between them.

#[cfg(feature = "integration_time")]
mod http;
mod rtc;
mod sync;

#[cfg(feature = "integration_time")]
pub use http::HttpTimeSource;
pub use rtc::RealTimeClock;
pub use rtc::SoftwareRtc;
pub use sync::NetworkTime;
pub use sync::ntp_poll;
pub use sync::ntp_update;
pub use sync::parse_timestamp;
#[cfg(test)]
pub(crate) use sync::tests::FakeNetworkTime;

#[derive(Debug, thiserror::Error)]
pub enum TimeError {
    #[error("Failed to fetch network time: {0}")]
    Fetch(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Unrecognized timestamp '{0}'")]
    Parse(String),
}
