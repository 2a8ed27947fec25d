use thiserror::Error;

use crate::PersonID;

/// Everything that can go wrong while building or filling an itinerary. Row-level parse errors
/// get logged and skipped by the caller; per-person errors are collected without aborting other
/// people; config errors are fatal.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ItineraryError {
    #[error("bad time string \"{raw}\": {reason}")]
    BadTime { raw: String, reason: String },
    #[error("day {0} out of range; the schedule covers days 1 through 5")]
    BadDay(usize),
    #[error("interval from {start} to {end} doesn't start before it ends")]
    BadInterval { start: String, end: String },
    #[error("interval ending at {end} falls outside the {horizon}s horizon")]
    OutsideHorizon { end: String, horizon: usize },
    #[error("\"{0}\" isn't a slot search side; use \"left\" or \"right\"")]
    BadSide(String),
    #[error("\"{0}\" isn't a fill policy; use \"shared\" or \"independent\"")]
    BadFillPolicy(String),
    #[error("invalid configuration: {0}")]
    BadConfig(String),
    #[error("person {0} has no known location anywhere, and there's no population fallback")]
    DataInsufficient(PersonID),
}
