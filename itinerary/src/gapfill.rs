use std::str::FromStr;

use rand_xorshift::XorShiftRng;

use schedutil::{fork_rng, prettyprint_usize, Counter, Timer};

use crate::distribution::Distributions;
use crate::{Cell, Itinerary, ItineraryError, Location, LocationDistribution, PersonID};

/// How many random draws one person's batch of absent cells gets. Both interpretations are
/// useful, so both stay available behind a flag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FillPolicy {
    /// Pool every absent cell's neighborhood into one distribution and draw a single shared fill
    /// value for the whole batch
    Shared,
    /// Draw independently per absent cell from that cell's own neighborhood
    Independent,
}

impl FromStr for FillPolicy {
    type Err = ItineraryError;

    fn from_str(raw: &str) -> Result<FillPolicy, ItineraryError> {
        match raw {
            "shared" => Ok(FillPolicy::Shared),
            "independent" => Ok(FillPolicy::Independent),
            x => Err(ItineraryError::BadFillPolicy(x.to_string())),
        }
    }
}

/// Assigns a location to every absent cell. Each cell consults the person's known entries at the
/// same time-of-day (within the configured slot radius) across all days; if that neighborhood is
/// empty, the person's own distribution, then the population's. A person with nothing anywhere
/// fails with DataInsufficient; failures are collected per person and never abort anyone else.
///
/// Every fill decision reads the pre-pass snapshot, so cells filled during this pass never count
/// as "known" for other cells, and the outcome doesn't depend on processing order. Given the same
/// seed, repeated runs produce identical fills.
pub fn fill_gaps(
    itinerary: &mut Itinerary,
    dists: &Distributions,
    policy: FillPolicy,
    base_rng: &mut XorShiftRng,
    timer: &mut Timer,
) -> Vec<(PersonID, ItineraryError)> {
    let people: Vec<PersonID> = itinerary.rows().keys().cloned().collect();
    // Fork sequentially in person order so parallel scheduling can't change anyone's draws.
    let requests: Vec<(PersonID, XorShiftRng)> = people
        .into_iter()
        .map(|p| (p, fork_rng(base_rng)))
        .collect();

    let snapshot = &*itinerary;
    let dists_ref = dists;
    let results = timer.parallelize("fill gaps per person", requests, move |(person, mut rng)| {
        let fills = fill_person(snapshot, dists_ref, policy, &person, &mut rng);
        (person, fills)
    });

    let mut failures = Vec::new();
    let mut filled = 0;
    for (person, result) in results {
        match result {
            Ok(fills) => {
                for (slot_idx, location) in fills {
                    filled += 1;
                    itinerary.set(
                        &person,
                        slot_idx,
                        Cell {
                            stop: Some(location),
                            duration: 0,
                        },
                    );
                }
            }
            Err(err) => failures.push((person, err)),
        }
    }
    timer.note(format!(
        "filled {} absent cells; {} people failed",
        prettyprint_usize(filled),
        prettyprint_usize(failures.len())
    ));
    failures
}

fn fill_person(
    snapshot: &Itinerary,
    dists: &Distributions,
    policy: FillPolicy,
    person: &PersonID,
    rng: &mut XorShiftRng,
) -> Result<Vec<(usize, Location)>, ItineraryError> {
    let row = &snapshot.rows()[person];
    let absent: Vec<usize> = row
        .iter()
        .enumerate()
        .filter(|(_, cell)| cell.stop.is_none())
        .map(|(idx, _)| idx)
        .collect();
    if absent.is_empty() {
        return Ok(Vec::new());
    }

    let fallback = |rng: &mut XorShiftRng| -> Result<Location, ItineraryError> {
        if let Some(dist) = dists.per_person.get(person) {
            return Ok(dist.weighted_sample(rng).clone());
        }
        if let Some(dist) = &dists.population {
            return Ok(dist.weighted_sample(rng).clone());
        }
        Err(ItineraryError::DataInsufficient(person.clone()))
    };

    let mut fills = Vec::new();
    match policy {
        FillPolicy::Independent => {
            for slot_idx in absent {
                let location = match local_distribution(snapshot, row, slot_idx) {
                    Some(dist) => dist.weighted_sample(rng).clone(),
                    None => fallback(rng)?,
                };
                fills.push((slot_idx, location));
            }
        }
        FillPolicy::Shared => {
            // One draw from the pooled neighborhoods covers every cell that had one; a second
            // shared draw covers the cells that didn't.
            let mut pooled = Counter::new();
            let mut orphans = Vec::new();
            let mut covered = Vec::new();
            for slot_idx in absent {
                match neighborhood_counts(snapshot, row, slot_idx) {
                    Some(counter) => {
                        for (loc, cnt) in counter.consume() {
                            pooled.add(loc, cnt);
                        }
                        covered.push(slot_idx);
                    }
                    None => orphans.push(slot_idx),
                }
            }
            if let Some(dist) = LocationDistribution::from_counter(&pooled) {
                let value = dist.weighted_sample(rng).clone();
                for slot_idx in covered {
                    fills.push((slot_idx, value.clone()));
                }
            }
            if !orphans.is_empty() {
                let value = fallback(rng)?;
                for slot_idx in orphans {
                    fills.push((slot_idx, value.clone()));
                }
            }
        }
    }
    Ok(fills)
}

fn local_distribution(
    snapshot: &Itinerary,
    row: &[Cell],
    slot_idx: usize,
) -> Option<LocationDistribution> {
    neighborhood_counts(snapshot, row, slot_idx)
        .and_then(|counter| LocationDistribution::from_counter(&counter))
}

/// The known locations at the same time-of-day across all days, within the configured slot
/// radius. None when the person knows nothing in the whole neighborhood.
fn neighborhood_counts(
    snapshot: &Itinerary,
    row: &[Cell],
    slot_idx: usize,
) -> Option<Counter<Location>> {
    let cfg = snapshot.cfg();
    let day_slots = cfg.slots_per_day();
    let time_of_day = slot_idx % day_slots;
    let radius = cfg.neighbor_radius as isize;

    let mut counter = Counter::new();
    for day in 0..cfg.num_days() {
        for offset in -radius..=radius {
            let idx = (day * day_slots) as isize + time_of_day as isize + offset;
            if idx < 0 || idx as usize >= row.len() {
                continue;
            }
            if let Some(loc) = &row[idx as usize].stop {
                counter.inc(loc.clone());
            }
        }
    }
    if counter.is_empty() {
        None
    } else {
        Some(counter)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use schedutil::Timer;

    use crate::{ActivityInterval, ItineraryBuilder, SlotCfg, WeeklyTime};

    use super::*;

    fn interval(uid: &str, day: usize, start: &str, end: &str, loc: &str) -> ActivityInterval {
        ActivityInterval {
            person: PersonID(uid.to_string()),
            day,
            start: WeeklyTime::new(day, start).unwrap(),
            end: WeeklyTime::new(day, end).unwrap(),
            location: Location(loc.to_string()),
        }
    }

    fn build(intervals: &[ActivityInterval]) -> (Itinerary, Distributions) {
        ItineraryBuilder::new(SlotCfg::default())
            .unwrap()
            .build(intervals, &mut Timer::throwaway())
    }

    #[test]
    fn no_cell_stays_absent() {
        let intervals = vec![
            interval("a", 1, "9:00am", "5:00pm", "work"),
            interval("b", 2, "8:00am", "8:00pm", "home"),
        ];
        let (mut itinerary, dists) = build(&intervals);
        assert!(itinerary.num_absent() > 0);

        let mut rng = XorShiftRng::seed_from_u64(42);
        let failures = fill_gaps(
            &mut itinerary,
            &dists,
            FillPolicy::Independent,
            &mut rng,
            &mut Timer::throwaway(),
        );
        assert!(failures.is_empty());
        assert_eq!(itinerary.num_absent(), 0);
    }

    #[test]
    fn same_seed_fills_identically() {
        let intervals = vec![
            interval("a", 1, "9:00am", "5:00pm", "work"),
            interval("a", 2, "9:00am", "12:00pm", "library"),
            interval("b", 2, "8:00am", "8:00pm", "home"),
        ];
        let fills = |policy| {
            let (mut itinerary, dists) = build(&intervals);
            let mut rng = XorShiftRng::seed_from_u64(7);
            fill_gaps(&mut itinerary, &dists, policy, &mut rng, &mut Timer::throwaway());
            itinerary
                .rows()
                .values()
                .flatten()
                .map(|cell| cell.stop.clone().unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(fills(FillPolicy::Independent), fills(FillPolicy::Independent));
        assert_eq!(fills(FillPolicy::Shared), fills(FillPolicy::Shared));
    }

    #[test]
    fn shared_policy_uses_one_value_per_batch() {
        // a knows exactly one location, so either policy must fill everything with it; the shared
        // policy does so via a single draw.
        let intervals = vec![interval("a", 3, "9:00am", "10:00am", "home")];
        let (mut itinerary, dists) = build(&intervals);
        let mut rng = XorShiftRng::seed_from_u64(1);
        let failures = fill_gaps(
            &mut itinerary,
            &dists,
            FillPolicy::Shared,
            &mut rng,
            &mut Timer::throwaway(),
        );
        assert!(failures.is_empty());
        for cell in &itinerary.rows()[&PersonID("a".to_string())] {
            assert_eq!(cell.stop, Some(Location("home".to_string())));
        }
    }

    #[test]
    fn person_with_no_data_fails_only_without_population_fallback() {
        // b appears in the schedule but every row is unusable, so they have no resolved slots.
        // With a populated world, they borrow the population's distribution.
        let intervals = vec![
            interval("a", 1, "9:00am", "5:00pm", "work"),
            ActivityInterval {
                person: PersonID("b".to_string()),
                day: 1,
                start: WeeklyTime::new(1, "9:00am").unwrap(),
                end: WeeklyTime::new(1, "9:00am").unwrap(),
                location: Location("void".to_string()),
            },
        ];
        let (mut itinerary, dists) = build(&intervals);
        let mut rng = XorShiftRng::seed_from_u64(42);
        let failures = fill_gaps(
            &mut itinerary,
            &dists,
            FillPolicy::Independent,
            &mut rng,
            &mut Timer::throwaway(),
        );
        assert!(failures.is_empty());
        assert_eq!(itinerary.num_absent(), 0);

        // And with nobody to borrow from, the failure is explicit, not a silent default.
        let empty = vec![ActivityInterval {
            person: PersonID("b".to_string()),
            day: 1,
            start: WeeklyTime::new(1, "9:00am").unwrap(),
            end: WeeklyTime::new(1, "9:00am").unwrap(),
            location: Location("void".to_string()),
        }];
        let (mut itinerary, dists) = build(&empty);
        let failures = fill_gaps(
            &mut itinerary,
            &dists,
            FillPolicy::Independent,
            &mut rng,
            &mut Timer::throwaway(),
        );
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0],
            (
                PersonID("b".to_string()),
                ItineraryError::DataInsufficient(PersonID("b".to_string()))
            )
        );
    }
}
