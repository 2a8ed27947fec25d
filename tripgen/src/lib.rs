//! Derives individual movement trips from a filled itinerary: scan each person's slot sequence
//! for location transitions, pick a travel mode, resolve both ends to road-network edges, and
//! assign a randomized departure time within the transition's slot. Trips come out partitioned by
//! mode, one document per mode, for the downstream traffic micro-simulator.

#[macro_use]
extern crate log;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use itinerary::{Location, PersonID, WeeklyTime};

pub use crate::derive::{derive_all, derive_person, PersonTrips};
pub use crate::edges::{EdgeCache, EdgeID, EdgeSets, LocationGeometry, LocationTable, LonLat, RoadNetwork};
pub use crate::mode::{AlwaysWalk, DistanceThreshold, ModeChoice};
pub use crate::output::{write_trip_files, TripDocument};

mod derive;
mod edges;
mod mode;
mod output;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TripMode {
    Walk,
    Bike,
    Car,
}

impl TripMode {
    pub fn all() -> Vec<TripMode> {
        vec![TripMode::Walk, TripMode::Bike, TripMode::Car]
    }

    pub fn verb(self) -> &'static str {
        match self {
            TripMode::Walk => "walk",
            TripMode::Bike => "bike",
            TripMode::Car => "drive",
        }
    }

    pub fn noun(self) -> &'static str {
        match self {
            TripMode::Walk => "Pedestrian",
            TripMode::Bike => "Bike",
            TripMode::Car => "Car",
        }
    }
}

/// One derived movement segment between two consecutive distinct locations. Owned by the
/// derivation step; never mutated after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TripLeg {
    pub depart: WeeklyTime,
    pub mode: TripMode,
    pub from_edge: EdgeID,
    pub to_edge: EdgeID,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TripError {
    #[error("no edges within {radius} of {location}")]
    NoEdgesFound { location: Location, radius: f64 },
    #[error("location {location} has no edges compatible with mode {mode:?}")]
    UnroutableLocation { location: Location, mode: TripMode },
    #[error("location {0} has an empty polygon")]
    EmptyPolygon(Location),
    #[error("person {person} still has an absent cell at slot {slot}; fill gaps first")]
    IncompleteItinerary { person: PersonID, slot: usize },
}
