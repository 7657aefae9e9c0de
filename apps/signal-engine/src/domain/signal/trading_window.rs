//! Trading-hours window check for signal intake.

use chrono::{NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// IST offset from UTC (+05:30). The exchange has no daylight saving.
const IST_UTC_OFFSET_SECS: i64 = 5 * 3600 + 30 * 60;

/// Current wall-clock time at the exchange (IST).
#[must_use]
pub fn market_now() -> NaiveTime {
    (Utc::now() + TimeDelta::seconds(IST_UTC_OFFSET_SECS)).time()
}

/// A daily time window during which signals are accepted.
///
/// Windows where `end < start` wrap around midnight, e.g. 22:00-02:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingWindow {
    /// Inclusive window start.
    pub start: NaiveTime,
    /// Inclusive window end.
    pub end: NaiveTime,
}

impl TradingWindow {
    /// Create a window from start/end times.
    #[must_use]
    pub const fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Default NSE equity intake window: 09:15 to 14:30.
    ///
    /// Intake closes an hour before the market does so bracket children have
    /// room to resolve within the session.
    #[must_use]
    pub fn market_hours() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(14, 30, 0).unwrap_or_default(),
        }
    }

    /// Whether the given time falls inside the window.
    #[must_use]
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            time >= self.start && time <= self.end
        } else {
            // Wraparound window crossing midnight.
            time >= self.start || time <= self.end
        }
    }
}

impl Default for TradingWindow {
    fn default() -> Self {
        Self::market_hours()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn market_hours_contains_midday() {
        let window = TradingWindow::market_hours();
        assert!(window.contains(t(9, 15)));
        assert!(window.contains(t(12, 0)));
        assert!(window.contains(t(14, 30)));
    }

    #[test]
    fn market_hours_rejects_outside() {
        let window = TradingWindow::market_hours();
        assert!(!window.contains(t(9, 14)));
        assert!(!window.contains(t(14, 31)));
        assert!(!window.contains(t(3, 0)));
        assert!(!window.contains(t(23, 0)));
    }

    #[test]
    fn wraparound_window_crosses_midnight() {
        let window = TradingWindow::new(t(22, 0), t(2, 0));
        assert!(window.contains(t(23, 30)));
        assert!(window.contains(t(0, 30)));
        assert!(window.contains(t(22, 0)));
        assert!(window.contains(t(2, 0)));
        assert!(!window.contains(t(12, 0)));
        assert!(!window.contains(t(21, 59)));
    }
}
