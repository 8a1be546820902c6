use std::cell::Cell;
use std::time::Instant;

use chrono::NaiveDateTime;
use chrono::TimeDelta;

/// Battery-backed clock the device keeps time with between syncs.
pub trait RealTimeClock {
    /// Commit a calendar date-time to the clock.
    fn set_datetime(&self, datetime: NaiveDateTime);

    /// Current local date-time.
    fn now(&self) -> NaiveDateTime;
}

/// Clock that counts forward from the last value it was set to.
///
/// Falls back to the host's local time until the first sync.
#[derive(Debug, Default)]
pub struct SoftwareRtc {
    anchor: Cell<Option<(NaiveDateTime, Instant)>>,
}

impl SoftwareRtc {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RealTimeClock for SoftwareRtc {
    fn set_datetime(&self, datetime: NaiveDateTime) {
        self.anchor.set(Some((datetime, Instant::now())));
    }

    fn now(&self) -> NaiveDateTime {
        match self.anchor.get() {
            Some((datetime, at)) => {
                datetime + TimeDelta::from_std(at.elapsed()).unwrap_or(TimeDelta::zero())
            }
            None => chrono::Local::now().naive_local(),
        }
    }
}
