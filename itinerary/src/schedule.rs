use anyhow::{Context, Result};
use serde::Deserialize;

use schedutil::{prettyprint_usize, Timer};

use crate::{ItineraryError, Location, PersonID, WeeklyTime};

/// One raw schedule row after normalization: the person was at the location for this span of
/// weekly seconds. Read once from input, never mutated.
#[derive(Clone, Debug)]
pub struct ActivityInterval {
    pub person: PersonID,
    pub day: usize,
    pub start: WeeklyTime,
    pub end: WeeklyTime,
    pub location: Location,
}

#[derive(Debug, Deserialize)]
struct Record {
    uid: String,
    day: usize,
    start_time: String,
    end_time: String,
    location: String,
}

impl ActivityInterval {
    fn from_record(rec: Record) -> Result<ActivityInterval, ItineraryError> {
        let start = WeeklyTime::new(rec.day, &rec.start_time)?;
        let end = WeeklyTime::new(rec.day, &rec.end_time)?;
        if start >= end {
            return Err(ItineraryError::BadInterval {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(ActivityInterval {
            person: PersonID(rec.uid),
            day: rec.day,
            start,
            end,
            location: Location(rec.location),
        })
    }
}

/// Reads the raw schedule CSV {uid, day, start_time, end_time, location}, with 12-hour am/pm time
/// strings. Malformed rows are logged and skipped; they never abort the batch. A completely
/// unreadable file does.
pub fn read_raw_schedule(path: &str, timer: &mut Timer) -> Result<Vec<ActivityInterval>> {
    timer.start(format!("read raw schedule from {}", path));
    let mut intervals = Vec::new();
    let mut skipped = 0;
    for (idx, rec) in csv::Reader::from_reader(fs_err::File::open(path)?)
        .deserialize()
        .enumerate()
    {
        let parsed: Result<ActivityInterval, anyhow::Error> = rec
            .context("unreadable row")
            .and_then(|rec: Record| ActivityInterval::from_record(rec).map_err(anyhow::Error::from));
        match parsed {
            Ok(interval) => intervals.push(interval),
            Err(err) => {
                warn!("skipping row {} of {}: {}", idx + 1, path, err);
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        timer.note(format!(
            "skipped {} malformed rows out of {}",
            prettyprint_usize(skipped),
            prettyprint_usize(skipped + intervals.len())
        ));
    }
    timer.stop(format!("read raw schedule from {}", path));
    Ok(intervals)
}
