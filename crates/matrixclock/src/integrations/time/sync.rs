use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::NaiveDateTime;
use tracing::debug;
use tracing::info;

use super::RealTimeClock;
use super::TimeError;

/// Source of the current local time, as reported by a network service.
#[async_trait(?Send)]
pub trait NetworkTime {
    /// Fetch the raw timestamp string, e.g. `2024-03-09 07:45:12.345 069 6 +0100 CET`.
    async fn local_time(&self) -> Result<String, TimeError>;
}

/// Set the real-time clock from the network.
///
/// Errors are returned to the caller untouched; inside the scheduler they
/// end the run.
pub async fn ntp_update(
    source: &dyn NetworkTime,
    rtc: &dyn RealTimeClock,
) -> Result<(), TimeError> {
    info!("setting date/time from network");
    let timestamp = source.local_time().await?;
    let datetime = parse_timestamp(&timestamp)?;
    debug!("network time: {} -> {}", timestamp.trim(), datetime);
    rtc.set_datetime(datetime);
    Ok(())
}

/// Resync the clock every `interval`, forever.
pub async fn ntp_poll(
    source: &dyn NetworkTime,
    rtc: &dyn RealTimeClock,
    interval: Duration,
) -> Result<(), TimeError> {
    loop {
        ntp_update(source, rtc).await?;
        tokio::time::sleep(interval).await;
    }
}

/// Parse a network timestamp into a local calendar date-time.
///
/// Accepts RFC 3339 (`2024-03-09T07:45:12+01:00`, the offset is dropped and
/// the local reading kept) and `YYYY-MM-DD HH:MM:SS[.fff]` followed by any
/// number of extra fields.
pub fn parse_timestamp(timestamp: &str) -> Result<NaiveDateTime, TimeError> {
    let mut fields = timestamp.split_whitespace();
    let first = fields
        .next()
        .ok_or_else(|| TimeError::Parse(timestamp.to_string()))?;

    if let Ok(datetime) = DateTime::parse_from_rfc3339(first) {
        return Ok(datetime.naive_local());
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(first, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(datetime);
    }

    let second = fields
        .next()
        .ok_or_else(|| TimeError::Parse(timestamp.to_string()))?;
    NaiveDateTime::parse_from_str(&format!("{first} {second}"), "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|_| TimeError::Parse(timestamp.to_string()))
}
