use std::collections::BTreeMap;

use rand::Rng;
use rand_xorshift::XorShiftRng;

use itinerary::{Location, PersonID};

use crate::{LonLat, TripMode};

/// Picks a travel mode for one transition. Pluggable so smarter policies (learned preferences,
/// transit availability) can slot in without touching the trip deriver.
pub trait ModeChoice: Send + Sync {
    fn choose(
        &self,
        person: &PersonID,
        from: &Location,
        to: &Location,
        rng: &mut XorShiftRng,
    ) -> TripMode;
}

/// Everyone walks everywhere. The simplest possible baseline, and the default.
pub struct AlwaysWalk;

impl ModeChoice for AlwaysWalk {
    fn choose(
        &self,
        _person: &PersonID,
        _from: &Location,
        _to: &Location,
        _rng: &mut XorShiftRng,
    ) -> TripMode {
        TripMode::Walk
    }
}

/// Chooses based on straight-line distance between the location centers, with a small random
/// chance of cycling at medium range.
pub struct DistanceThreshold {
    centers: BTreeMap<Location, LonLat>,
    pub walk_cutoff_meters: f64,
    pub bike_cutoff_meters: f64,
}

impl DistanceThreshold {
    pub fn new(centers: BTreeMap<Location, LonLat>) -> DistanceThreshold {
        DistanceThreshold {
            centers,
            walk_cutoff_meters: 800.0,
            bike_cutoff_meters: 4800.0,
        }
    }
}

impl ModeChoice for DistanceThreshold {
    fn choose(
        &self,
        person: &PersonID,
        from: &Location,
        to: &Location,
        rng: &mut XorShiftRng,
    ) -> TripMode {
        let (a, b) = match (self.centers.get(from), self.centers.get(to)) {
            (Some(a), Some(b)) => (*a, *b),
            _ => {
                // No geometry for one end; fall back to the baseline mode.
                debug!("{}: no center for {} or {}, walking", person, from, to);
                return TripMode::Walk;
            }
        };
        let dist = a.gps_dist_meters(b);

        if dist < self.walk_cutoff_meters {
            return TripMode::Walk;
        }
        if dist < self.bike_cutoff_meters && rng.gen_bool(0.2) {
            return TripMode::Bike;
        }
        TripMode::Car
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn ctx() -> (PersonID, Location, Location) {
        (
            PersonID("p1".to_string()),
            Location("a".to_string()),
            Location("b".to_string()),
        )
    }

    #[test]
    fn always_walk_always_walks() {
        let (p, a, b) = ctx();
        let mut rng = XorShiftRng::seed_from_u64(42);
        assert_eq!(AlwaysWalk.choose(&p, &a, &b, &mut rng), TripMode::Walk);
    }

    #[test]
    fn short_trips_walk_long_trips_drive() {
        let (p, a, b) = ctx();
        let mut centers = BTreeMap::new();
        centers.insert(a.clone(), LonLat::new(0.0, 0.0));
        // Roughly 111m per 0.001 degrees of latitude
        centers.insert(b.clone(), LonLat::new(0.0, 0.001));
        let mut far = centers.clone();
        far.insert(b.clone(), LonLat::new(0.0, 1.0));

        let mut rng = XorShiftRng::seed_from_u64(42);
        assert_eq!(
            DistanceThreshold::new(centers).choose(&p, &a, &b, &mut rng),
            TripMode::Walk
        );
        assert_eq!(
            DistanceThreshold::new(far).choose(&p, &a, &b, &mut rng),
            TripMode::Car
        );
    }

    #[test]
    fn unknown_centers_fall_back_to_walking() {
        let (p, a, b) = ctx();
        let mut rng = XorShiftRng::seed_from_u64(42);
        assert_eq!(
            DistanceThreshold::new(BTreeMap::new()).choose(&p, &a, &b, &mut rng),
            TripMode::Walk
        );
    }
}
