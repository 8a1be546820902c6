use std::rc::Rc;
use std::time::Duration;

use super::Animated;
use super::Layer;
use super::Point;
use crate::integrations::time::RealTimeClock;

/// Text label showing the time of day from the real-time clock.
pub struct ClockLabel {
    layer: Box<dyn Layer>,
    rtc: Rc<dyn RealTimeClock>,
    position: Point,
    delay: Duration,
    shown: Option<String>,
}

impl ClockLabel {
    pub fn new(
        layer: Box<dyn Layer>,
        rtc: Rc<dyn RealTimeClock>,
        position: Point,
        delay: Duration,
    ) -> Self {
        Self {
            layer,
            rtc,
            position,
            delay,
            shown: None,
        }
    }

    /// Text currently on the display, if anything has been drawn yet.
    pub fn text(&self) -> Option<&str> {
        self.shown.as_deref()
    }
}

impl Animated for ClockLabel {
    fn name(&self) -> &str {
        "clock"
    }

    fn render(&mut self) {
        let text = self.rtc.now().format("%H:%M").to_string();
        // Only redraw on change
        if self.shown.as_deref() != Some(text.as_str()) {
            self.layer.text(self.position, &text);
            self.shown = Some(text);
        }
    }

    fn delay(&self) -> Duration {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::display::Surface;
    use crate::display::TracingSurface;
    use crate::integrations::time::SoftwareRtc;

    #[test]
    fn test_clock_renders_rtc_time() {
        let rtc = Rc::new(SoftwareRtc::new());
        let time = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 45, 0)
            .unwrap();
        rtc.set_datetime(time);

        let mut clock = ClockLabel::new(
            TracingSurface.layer("clock"),
            rtc,
            Point::new(1, 3),
            Duration::from_millis(500),
        );
        assert_eq!(clock.text(), None);

        clock.render();
        assert_eq!(clock.text(), Some("07:45"));
    }
}
