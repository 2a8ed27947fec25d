use std::str::FromStr;

use crate::{ItineraryError, Location, PersonID, SlotCfg, WeeklyTime};

/// Which boundary a slot search should return, relative to the query second.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Side {
    /// The largest boundary <= the query
    Left,
    /// The smallest boundary > the query
    Right,
}

impl FromStr for Side {
    type Err = ItineraryError;

    fn from_str(raw: &str) -> Result<Side, ItineraryError> {
        match raw {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            x => Err(ItineraryError::BadSide(x.to_string())),
        }
    }
}

/// One person's presence at one location attributed to one timeslot. Several of these can claim
/// the same (person, slot) before resolution.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SlotRecord {
    pub person: PersonID,
    /// The slot's start second
    pub slot: usize,
    pub location: Location,
    /// Seconds of presence within this slot; never exceeds the slot width
    pub duration: usize,
}

/// The fixed-width discretization of the weekly horizon. Boundaries are the ascending slot start
/// seconds, plus the horizon itself at the end so every slot has a right boundary.
pub struct SlotGrid {
    boundaries: Vec<usize>,
    width: usize,
}

impl SlotGrid {
    pub fn new(cfg: &SlotCfg) -> Result<SlotGrid, ItineraryError> {
        cfg.validate()?;
        Ok(SlotGrid {
            boundaries: (0..=cfg.num_slots())
                .map(|i| i * cfg.slot_width)
                .collect(),
            width: cfg.slot_width,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn num_slots(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// The start seconds of every slot, ascending.
    pub fn slot_starts(&self) -> &[usize] {
        &self.boundaries[..self.boundaries.len() - 1]
    }

    /// Binary search for the boundary bracketing `value`. The search range excludes the final
    /// boundary, so Side::Right always has an index to return. At each step, the range narrows
    /// towards whichever of two adjacent boundaries is numerically closer to the query.
    pub fn nearest_boundary(&self, value: usize, side: Side) -> usize {
        let mut lo = 0;
        let mut hi = self.boundaries.len() - 2;
        while lo < hi {
            let mid = (lo + hi) / 2;
            let left_dist = self.boundaries[mid].abs_diff(value);
            let right_dist = self.boundaries[mid + 1].abs_diff(value);
            if right_dist < left_dist {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        // The nearest boundary isn't necessarily on the requested side of the query; shift over
        // if it's not.
        match side {
            Side::Left => {
                if self.boundaries[lo] > value && lo > 0 {
                    lo - 1
                } else {
                    lo
                }
            }
            Side::Right => {
                if self.boundaries[lo] > value {
                    lo
                } else {
                    lo + 1
                }
            }
        }
    }

    /// Partitions one normalized interval's duration across every slot it overlaps. The emitted
    /// durations always sum to exactly end - start.
    pub fn expand(
        &self,
        person: &PersonID,
        location: &Location,
        start: WeeklyTime,
        end: WeeklyTime,
    ) -> Result<Vec<SlotRecord>, ItineraryError> {
        if start >= end {
            return Err(ItineraryError::BadInterval {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        // Anything past the final boundary would get misattributed to the last slot, inflating
        // its duration beyond the slot width.
        let horizon = self.width * self.num_slots();
        if end.seconds() > horizon {
            return Err(ItineraryError::OutsideHorizon {
                end: end.to_string(),
                horizon,
            });
        }
        let start = start.seconds();
        let end = end.seconds();

        let start_idx = self.nearest_boundary(start, Side::Left);
        let end_idx = self.nearest_boundary(end, Side::Left);
        let record = |slot: usize, duration: usize| SlotRecord {
            person: person.clone(),
            slot,
            location: location.clone(),
            duration,
        };

        if start_idx == end_idx {
            return Ok(vec![record(self.boundaries[start_idx], end - start)]);
        }

        let mut records = Vec::new();
        // Head: from the start up to the next boundary
        records.push(record(
            self.boundaries[start_idx],
            self.boundaries[start_idx + 1] - start,
        ));
        // Full slots strictly between
        let mut slot = self.boundaries[start_idx + 1];
        while slot < self.boundaries[end_idx] {
            records.push(record(slot, self.width));
            slot += self.width;
        }
        // Tail: from the end slot's boundary up to the end. When the interval ends exactly on a
        // boundary, there's nothing left to attribute.
        let tail = end - self.boundaries[end_idx];
        if tail > 0 {
            records.push(record(self.boundaries[end_idx], tail));
        }
        Ok(records)
    }
}
