use schedutil::Counter;

use crate::{LocationDistribution, SlotRecord};

/// Collapses all the records claiming one (person, slot) into a single winner. Durations are
/// summed per location first; the location with the most summed presence wins. Ties break towards
/// whichever tied location the person frequents most elsewhere, per `tiebreak` (which is computed
/// from slots other than this one, so a contested slot never influences its own resolution).
pub fn resolve_group(
    mut records: Vec<SlotRecord>,
    tiebreak: Option<&LocationDistribution>,
) -> Option<SlotRecord> {
    if records.len() <= 1 {
        return records.pop();
    }

    let mut durations = Counter::new();
    for r in &records {
        durations.add(r.location.clone(), r.duration);
    }

    let candidates = durations.max_keys();
    let winner = if candidates.len() == 1 {
        candidates.into_iter().next().unwrap()
    } else {
        // max_keys is in location order, and max_by_key takes the last maximum, so ties that even
        // the distribution can't break still resolve deterministically.
        candidates
            .into_iter()
            .max_by_key(|loc| {
                let freq = tiebreak.map(|d| d.freq(loc)).unwrap_or(0.0);
                ordered_float(freq)
            })
            .unwrap()
    };

    let duration = durations.get(winner.clone());
    let first = records.into_iter().next().unwrap();
    Some(SlotRecord {
        person: first.person,
        slot: first.slot,
        location: winner,
        duration,
    })
}

// f64 frequencies are in [0, 1], so comparing the raw bits of their ordered form is sound.
fn ordered_float(x: f64) -> u64 {
    debug_assert!(x >= 0.0);
    x.to_bits()
}

#[cfg(test)]
mod tests {
    use schedutil::Counter;

    use crate::{Location, PersonID};

    use super::*;

    fn rec(slot: usize, location: &str, duration: usize) -> SlotRecord {
        SlotRecord {
            person: PersonID("p1".to_string()),
            slot,
            location: Location(location.to_string()),
            duration,
        }
    }

    #[test]
    fn empty_and_singleton_pass_through() {
        assert_eq!(resolve_group(Vec::new(), None), None);
        let r = rec(0, "home", 600);
        assert_eq!(resolve_group(vec![r.clone()], None), Some(r));
    }

    #[test]
    fn longest_summed_duration_wins() {
        let records = vec![rec(0, "home", 1000), rec(0, "work", 1500), rec(0, "home", 900)];
        let winner = resolve_group(records, None).unwrap();
        assert_eq!(winner.location, Location("home".to_string()));
        assert_eq!(winner.duration, 1900);
    }

    #[test]
    fn ties_break_towards_the_frequented_location() {
        let mut counter = Counter::new();
        counter.add(Location("a".to_string()), 10);
        counter.add(Location("b".to_string()), 2);
        let dist = LocationDistribution::from_counter(&counter).unwrap();

        // Tie between a and b, with the distribution favoring a. b sorts after a, so without the
        // tie-break, b would win; this must deterministically resolve to a.
        let records = vec![rec(4, "b", 1800), rec(4, "a", 1800)];
        let winner = resolve_group(records, Some(&dist)).unwrap();
        assert_eq!(winner.location, Location("a".to_string()));
        assert_eq!(winner.duration, 1800);
        assert_eq!(winner.slot, 4);
    }
}
