//! Wall-clock parsing for "HH:MM" period times.

use chrono::{NaiveTime, Timelike};
use serde::Serialize;

/// Hour and minute of a period boundary, no date and no timezone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Clock {
    pub hour: u32,
    pub minute: u32,
}

impl Clock {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    /// Minutes since midnight. Saturates instead of overflowing on absurd input.
    pub fn minutes(&self) -> u32 {
        self.hour.saturating_mul(60).saturating_add(self.minute)
    }
}

impl From<NaiveTime> for Clock {
    /// Truncates to minute granularity; seconds are dropped.
    fn from(time: NaiveTime) -> Self {
        Self::new(time.hour(), time.minute())
    }
}

/// Parses an "HH:MM" string without ever failing.
///
/// A missing or unparseable hour or minute component reads as `0`, so `""`
/// is midnight and `"9"` is 09:00. Anything after the minute (e.g. seconds in
/// "08:30:00") is ignored. Out-of-range values are not clamped, and
/// `Clock::minutes` saturates rather than overflowing.
pub fn parse_clock(value: &str) -> Clock {
    let mut parts = value.split(':');
    let hour = parse_component(parts.next());
    let minute = parse_component(parts.next());
    Clock { hour, minute }
}

fn parse_component(part: Option<&str>) -> u32 {
    part.and_then(|p| p.trim().parse::<u32>().ok()).unwrap_or(0)
}

/// Parses a user-supplied "HH:MM" query value strictly.
///
/// Used at the HTTP edge for the `at` override, where a typo should be
/// reported instead of silently becoming midnight.
pub fn parse_clock_strict(value: &str) -> Option<Clock> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .ok()
        .map(Clock::from)
}
