use rand::seq::SliceRandom;
use rand::Rng;
use rand_xorshift::XorShiftRng;

use itinerary::{Cell, Itinerary, PersonID, WeeklyTime};
use schedutil::{fork_rng, prettyprint_usize, Timer};

use crate::{EdgeCache, EdgeID, ModeChoice, TripError, TripLeg, TripMode};

/// One person's ordered trips for the whole week.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct PersonTrips {
    pub person: PersonID,
    pub legs: Vec<TripLeg>,
}

/// Scans one person's filled slot sequence and emits a leg per location transition. Consecutive
/// legs chain: each one starts at the edge the previous one arrived at, so a person's week is a
/// connected path through the network.
pub fn derive_person(
    person: &PersonID,
    row: &[Cell],
    slot_starts: &[usize],
    slot_width: usize,
    edges: &EdgeCache,
    policy: &dyn ModeChoice,
    rng: &mut XorShiftRng,
) -> Result<Vec<TripLeg>, TripError> {
    let occupant = |idx: usize| {
        row[idx].stop.as_ref().ok_or_else(|| TripError::IncompleteItinerary {
            person: person.clone(),
            slot: slot_starts[idx],
        })
    };
    let pick_edge = |location: &itinerary::Location,
                     mode: TripMode,
                     rng: &mut XorShiftRng|
     -> Result<EdgeID, TripError> {
        let unroutable = || TripError::UnroutableLocation {
            location: location.clone(),
            mode,
        };
        let sets = edges.get(location).ok_or_else(unroutable)?;
        let compatible = sets.compatible_with(mode);
        // An empty candidate set is a hard failure; picking an arbitrary edge here would teleport
        // the person.
        compatible.choose(rng).cloned().ok_or_else(unroutable)
    };

    let mut legs: Vec<TripLeg> = Vec::new();
    // The last pair has no slot one width ahead, so it can't start a transition.
    for idx in 0..row.len().saturating_sub(1) {
        let from = occupant(idx)?;
        let to = occupant(idx + 1)?;
        if from == to {
            continue;
        }

        let mode = policy.choose(person, from, to, rng);
        let from_edge = match legs.last() {
            Some(prev) => prev.to_edge.clone(),
            None => pick_edge(from, mode, rng)?,
        };
        let to_edge = pick_edge(to, mode, rng)?;
        // The transition belongs to the slot where the new location first appears; departure
        // lands uniformly somewhere inside that window.
        let depart =
            WeeklyTime::seconds_since_monday(slot_starts[idx + 1] + rng.gen_range(0..slot_width));
        legs.push(TripLeg {
            depart,
            mode,
            from_edge,
            to_edge,
        });
    }
    Ok(legs)
}

/// Derives trips for everyone, fanning out per person. One person failing (an unroutable
/// location, an unfilled cell) never stops the others; their failures come back alongside the
/// successes.
pub fn derive_all(
    itinerary: &Itinerary,
    edges: &EdgeCache,
    policy: &dyn ModeChoice,
    base_rng: &mut XorShiftRng,
    timer: &mut Timer,
) -> (Vec<PersonTrips>, Vec<(PersonID, TripError)>) {
    let requests: Vec<(PersonID, XorShiftRng)> = itinerary
        .rows()
        .keys()
        .map(|p| (p.clone(), fork_rng(base_rng)))
        .collect();

    let slot_starts = itinerary.slot_starts();
    let slot_width = itinerary.cfg().slot_width;
    let results = timer.parallelize("derive trips per person", requests, move |(person, mut rng)| {
        let result = derive_person(
            &person,
            &itinerary.rows()[&person],
            slot_starts,
            slot_width,
            edges,
            policy,
            &mut rng,
        );
        (person, result)
    });

    let mut people = Vec::new();
    let mut failures = Vec::new();
    for (person, result) in results {
        match result {
            Ok(legs) => {
                if !legs.is_empty() {
                    people.push(PersonTrips { person, legs });
                }
            }
            Err(err) => {
                warn!("no trips for {}: {}", person, err);
                failures.push((person, err));
            }
        }
    }
    timer.note(format!(
        "derived trips for {} people, {} failed",
        prettyprint_usize(people.len()),
        prettyprint_usize(failures.len())
    ));
    (people, failures)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use itinerary::Location;

    use crate::{AlwaysWalk, EdgeSets};

    use super::*;

    fn cell(loc: &str) -> Cell {
        Cell {
            stop: Some(Location(loc.to_string())),
            duration: 0,
        }
    }

    fn edge_cache(entries: &[(&str, &str)]) -> EdgeCache {
        let mut cache = EdgeCache::new(100.0, 8);
        for (loc, edge) in entries {
            cache.insert_for_test(
                Location(loc.to_string()),
                EdgeSets {
                    pedestrian: vec![EdgeID(edge.to_string())],
                    vehicle: vec![EdgeID(edge.to_string())],
                },
            );
        }
        cache
    }

    fn slot_starts(n: usize) -> Vec<usize> {
        (0..n).map(|i| i * 3600).collect()
    }

    #[test]
    fn home_work_home_yields_two_chained_legs() {
        let row: Vec<Cell> = ["home"; 4]
            .iter()
            .chain(["work"; 4].iter())
            .chain(["home"; 4].iter())
            .map(|l| cell(l))
            .collect();
        let edges = edge_cache(&[("home", "e_home"), ("work", "e_work")]);
        let mut rng = XorShiftRng::seed_from_u64(42);

        let legs = derive_person(
            &PersonID("p1".to_string()),
            &row,
            &slot_starts(12),
            3600,
            &edges,
            &AlwaysWalk,
            &mut rng,
        )
        .unwrap();

        assert_eq!(legs.len(), 2);
        // home -> work at slot 4, work -> home at slot 8
        assert!(legs[0].depart.seconds() >= 4 * 3600 && legs[0].depart.seconds() < 5 * 3600);
        assert!(legs[1].depart.seconds() >= 8 * 3600 && legs[1].depart.seconds() < 9 * 3600);
        assert_eq!(legs[0].from_edge, EdgeID("e_home".to_string()));
        assert_eq!(legs[0].to_edge, EdgeID("e_work".to_string()));
        // Continuity: the second trip starts where the first ended
        assert_eq!(legs[1].from_edge, legs[0].to_edge);
        assert_eq!(legs[1].to_edge, EdgeID("e_home".to_string()));
        assert_eq!(legs[0].mode, TripMode::Walk);
    }

    #[test]
    fn constant_row_yields_no_trips() {
        let row: Vec<Cell> = (0..12).map(|_| cell("home")).collect();
        let edges = edge_cache(&[("home", "e_home")]);
        let mut rng = XorShiftRng::seed_from_u64(42);
        let legs = derive_person(
            &PersonID("p1".to_string()),
            &row,
            &slot_starts(12),
            3600,
            &edges,
            &AlwaysWalk,
            &mut rng,
        )
        .unwrap();
        assert!(legs.is_empty());
    }

    #[test]
    fn unroutable_location_fails_loudly() {
        let row = vec![cell("home"), cell("nowhere")];
        // "nowhere" never got resolved into the cache
        let edges = edge_cache(&[("home", "e_home")]);
        let mut rng = XorShiftRng::seed_from_u64(42);
        let err = derive_person(
            &PersonID("p1".to_string()),
            &row,
            &slot_starts(2),
            3600,
            &edges,
            &AlwaysWalk,
            &mut rng,
        )
        .unwrap_err();
        assert_eq!(
            err,
            TripError::UnroutableLocation {
                location: Location("nowhere".to_string()),
                mode: TripMode::Walk,
            }
        );
    }

    #[test]
    fn unfilled_cell_fails_loudly() {
        let row = vec![
            cell("home"),
            Cell {
                stop: None,
                duration: 0,
            },
        ];
        let edges = edge_cache(&[("home", "e_home")]);
        let mut rng = XorShiftRng::seed_from_u64(42);
        let err = derive_person(
            &PersonID("p1".to_string()),
            &row,
            &slot_starts(2),
            3600,
            &edges,
            &AlwaysWalk,
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, TripError::IncompleteItinerary { .. }));
    }
}
