//! Converts sparse, interval-based activity schedules ("person P is at location L from 9:30am to
//! 11:00am on day 2") into dense, gap-filled, per-timeslot presence itineraries covering a
//! five-day week. The stages, in order:
//!
//! 1. Parse the raw schedule and normalize each interval onto a Monday-anchored second axis.
//! 2. Expand each interval across the fixed-width timeslots it overlaps.
//! 3. Resolve conflicts when several activities claim the same (person, slot).
//! 4. Materialize the dense person x slot grid, leaving uncovered cells absent.
//! 5. Probabilistically fill absent cells from temporal-neighborhood and fallback statistics.
//!
//! The `tripgen` crate consumes the filled grid and derives movement trips from it.

#[macro_use]
extern crate log;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use crate::builder::{Cell, Itinerary, ItineraryBuilder};
pub use crate::distribution::{Distributions, LocationDistribution};
pub use crate::error::ItineraryError;
pub use crate::gapfill::{fill_gaps, FillPolicy};
pub use crate::resolve::resolve_group;
pub use crate::schedule::{read_raw_schedule, ActivityInterval};
pub use crate::slots::{Side, SlotGrid, SlotRecord};
pub use crate::time::WeeklyTime;

mod builder;
mod distribution;
mod error;
mod gapfill;
mod resolve;
mod schedule;
mod slots;
mod time;

/// Identifies one person in the input schedule. These come straight from the input's uid column;
/// they're opaque to the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonID(pub String);

impl fmt::Display for PersonID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A symbolic location from the input's vocabulary ("home", "library", ...). Resolving these to
/// road-network geometry is tripgen's job.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location(pub String);

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// All the tuning knobs for one pipeline run. Built once, never mutated afterwards.
#[derive(Clone, Copy, Debug)]
pub struct SlotCfg {
    /// Width of one timeslot, in seconds
    pub slot_width: usize,
    /// Total seconds covered by the grid, starting Monday midnight
    pub horizon: usize,
    /// How many slots on either side of a time-of-day count as its gap-fill neighborhood
    pub neighbor_radius: usize,
}

impl Default for SlotCfg {
    fn default() -> SlotCfg {
        SlotCfg {
            slot_width: 3600,
            // 5 days
            horizon: 432_000,
            neighbor_radius: 2,
        }
    }
}

impl SlotCfg {
    pub fn validate(&self) -> Result<(), ItineraryError> {
        if self.slot_width == 0 {
            return Err(ItineraryError::BadConfig("slot width is 0".to_string()));
        }
        if self.horizon == 0 || self.horizon % self.slot_width != 0 {
            return Err(ItineraryError::BadConfig(format!(
                "horizon {} isn't a positive multiple of slot width {}",
                self.horizon, self.slot_width
            )));
        }
        if 86_400 % self.slot_width != 0 {
            return Err(ItineraryError::BadConfig(format!(
                "slot width {} doesn't evenly divide a day",
                self.slot_width
            )));
        }
        Ok(())
    }

    pub fn num_slots(&self) -> usize {
        self.horizon / self.slot_width
    }

    pub fn slots_per_day(&self) -> usize {
        86_400 / self.slot_width
    }

    pub fn num_days(&self) -> usize {
        (self.horizon + 86_399) / 86_400
    }
}
