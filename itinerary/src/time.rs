use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ItineraryError;

/// A second offset from Monday midnight, the common time axis for the whole five-day grid. Day 1
/// at 00:00:00 is 0; day 5 at 11:59pm is 431,940. Monotonic in (day, time-of-day) by
/// construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WeeklyTime(usize);

impl WeeklyTime {
    /// `day` is 1-based. `clock` is a 12-hour wall-clock string like "8:05am" or "12:30pm".
    pub fn new(day: usize, clock: &str) -> Result<WeeklyTime, ItineraryError> {
        if day < 1 || day > 5 {
            return Err(ItineraryError::BadDay(day));
        }
        Ok(WeeklyTime((day - 1) * 86_400 + parse_clock(clock)?))
    }

    /// Only for times already on the weekly axis, like slot starts.
    pub fn seconds_since_monday(value: usize) -> WeeklyTime {
        WeeklyTime(value)
    }

    pub fn seconds(self) -> usize {
        self.0
    }

    pub fn day(self) -> usize {
        self.0 / 86_400 + 1
    }
}

impl fmt::Display for WeeklyTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let within = self.0 % 86_400;
        write!(
            f,
            "day {} {:02}:{:02}:{:02}",
            self.day(),
            within / 3600,
            (within % 3600) / 60,
            within % 60
        )
    }
}

/// Converts a 12-hour clock string to seconds since midnight. "8:05am" is 08:05, "12:30pm" stays
/// 12:30, "12:15am" wraps to 00:15.
fn parse_clock(raw: &str) -> Result<usize, ItineraryError> {
    let bad = |reason: &str| ItineraryError::BadTime {
        raw: raw.to_string(),
        reason: reason.to_string(),
    };

    let lower = raw.trim().to_lowercase();
    let (clock, pm) = if let Some(x) = lower.strip_suffix("am") {
        (x.trim_end(), false)
    } else if let Some(x) = lower.strip_suffix("pm") {
        (x.trim_end(), true)
    } else {
        return Err(bad("missing am/pm suffix"));
    };

    let parts: Vec<&str> = clock.split(':').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return Err(bad("expected hh:mm or hh:mm:ss"));
    }
    let hours = parts[0].parse::<usize>().map_err(|_| bad("bad hours"))?;
    let minutes = parts[1].parse::<usize>().map_err(|_| bad("bad minutes"))?;
    let seconds = if parts.len() == 3 {
        parts[2].parse::<usize>().map_err(|_| bad("bad seconds"))?
    } else {
        0
    };
    if hours < 1 || hours > 12 {
        return Err(bad("hours outside 1-12"));
    }
    if minutes >= 60 || seconds >= 60 {
        return Err(bad("minutes or seconds outside 0-59"));
    }

    // On a 12-hour clock, 12 acts as 0 within its half of the day.
    let hours24 = match (hours, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };
    Ok(hours24 * 3600 + minutes * 60 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_hour_conversion() {
        assert_eq!(parse_clock("8:05am"), Ok(8 * 3600 + 5 * 60));
        assert_eq!(parse_clock("12:30pm"), Ok(12 * 3600 + 30 * 60));
        assert_eq!(parse_clock("12:15am"), Ok(15 * 60));
        assert_eq!(parse_clock("11:59PM"), Ok(23 * 3600 + 59 * 60));
        assert_eq!(parse_clock("1:00:30pm"), Ok(13 * 3600 + 30));
    }

    #[test]
    fn malformed_clocks_rejected() {
        for raw in ["8:05", "25:00am", "8:61am", "noon", "8am", ""] {
            assert!(parse_clock(raw).is_err(), "{} should not parse", raw);
        }
    }

    #[test]
    fn weekly_normalization_is_monotonic() {
        let a = WeeklyTime::new(1, "11:59pm").unwrap();
        let b = WeeklyTime::new(2, "12:00am").unwrap();
        let c = WeeklyTime::new(2, "12:01am").unwrap();
        assert!(a < b);
        assert!(b < c);
        assert_eq!(b.seconds(), 86_400);
        assert_eq!(c.day(), 2);
    }

    #[test]
    fn bad_day_rejected() {
        assert_eq!(WeeklyTime::new(0, "8:00am"), Err(ItineraryError::BadDay(0)));
        assert_eq!(WeeklyTime::new(6, "8:00am"), Err(ItineraryError::BadDay(6)));
    }
}
