use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand_xorshift::XorShiftRng;

use schedutil::Counter;

use crate::{Location, PersonID};

/// An immutable relative-frequency distribution over locations. Built once from occupancy counts,
/// then only queried; all randomness comes through the injected rng.
#[derive(Clone, Debug)]
pub struct LocationDistribution {
    // (location, probability), probabilities summing to 1, in location order
    weights: Vec<(Location, f64)>,
}

impl LocationDistribution {
    /// None if there's nothing to count.
    pub fn from_counter(counter: &Counter<Location>) -> Option<LocationDistribution> {
        if counter.is_empty() {
            return None;
        }
        let total = counter.sum() as f64;
        Some(LocationDistribution {
            weights: counter
                .borrow()
                .iter()
                .map(|(loc, cnt)| (loc.clone(), (*cnt as f64) / total))
                .collect(),
        })
    }

    /// The relative frequency of one location; 0 if it never occurs.
    pub fn freq(&self, location: &Location) -> f64 {
        self.weights
            .iter()
            .find(|(loc, _)| loc == location)
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }

    /// Draws one location, weighted by frequency. The weights are non-empty and positive by
    /// construction, so this can't fail.
    pub fn weighted_sample(&self, rng: &mut XorShiftRng) -> &Location {
        &self.weights.choose_weighted(rng, |(_, w)| *w).unwrap().0
    }
}

/// The frequency statistics the gap filler falls back on: one distribution per person with any
/// known slots, plus the population-wide aggregate.
pub struct Distributions {
    pub per_person: BTreeMap<PersonID, LocationDistribution>,
    pub population: Option<LocationDistribution>,
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn loc(x: &str) -> Location {
        Location(x.to_string())
    }

    #[test]
    fn frequencies_sum_to_one() {
        let mut counter = Counter::new();
        counter.add(loc("home"), 3);
        counter.add(loc("work"), 1);
        let dist = LocationDistribution::from_counter(&counter).unwrap();
        assert_eq!(dist.freq(&loc("home")), 0.75);
        assert_eq!(dist.freq(&loc("work")), 0.25);
        assert_eq!(dist.freq(&loc("gym")), 0.0);
    }

    #[test]
    fn empty_counter_has_no_distribution() {
        assert!(LocationDistribution::from_counter(&Counter::new()).is_none());
    }

    #[test]
    fn sampling_is_deterministic_per_seed() {
        let mut counter = Counter::new();
        counter.add(loc("home"), 5);
        counter.add(loc("work"), 5);
        let dist = LocationDistribution::from_counter(&counter).unwrap();

        let draw = |seed| {
            let mut rng = XorShiftRng::seed_from_u64(seed);
            (0..20)
                .map(|_| dist.weighted_sample(&mut rng).clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(42), draw(42));
    }
}
