use anyhow::Result;
use serde::{Deserialize, Serialize};

use schedutil::prettyprint_usize;

use crate::{PersonTrips, TripLeg, TripMode};

/// One mode's slice of the derived trips: every person keeps only their legs of that mode, in
/// departure order. The three documents share this schema.
#[derive(Debug, Serialize, Deserialize)]
pub struct TripDocument {
    pub mode: TripMode,
    pub people: Vec<PersonTrips>,
}

impl TripDocument {
    fn partition(all: &[PersonTrips], mode: TripMode) -> TripDocument {
        let mut people = Vec::new();
        for pt in all {
            let legs: Vec<TripLeg> = pt.legs.iter().filter(|l| l.mode == mode).cloned().collect();
            if !legs.is_empty() {
                people.push(PersonTrips {
                    person: pt.person.clone(),
                    legs,
                });
            }
        }
        TripDocument { mode, people }
    }
}

/// Writes one JSON document per travel mode under `out_dir`: walk.json, bike.json, car.json.
pub fn write_trip_files(all: &[PersonTrips], out_dir: &str) -> Result<()> {
    fs_err::create_dir_all(out_dir)?;
    for mode in TripMode::all() {
        let doc = TripDocument::partition(all, mode);
        let stem = match mode {
            TripMode::Walk => "walk",
            TripMode::Bike => "bike",
            TripMode::Car => "car",
        };
        let path = format!("{}/{}.json", out_dir, stem);
        info!(
            "writing {} people's {} trips to {}",
            prettyprint_usize(doc.people.len()),
            mode.verb(),
            path
        );
        serde_json::to_writer_pretty(fs_err::File::create(&path)?, &doc)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use itinerary::{PersonID, WeeklyTime};

    use crate::EdgeID;

    use super::*;

    fn leg(depart: usize, mode: TripMode) -> TripLeg {
        TripLeg {
            depart: WeeklyTime::seconds_since_monday(depart),
            mode,
            from_edge: EdgeID("a".to_string()),
            to_edge: EdgeID("b".to_string()),
        }
    }

    #[test]
    fn partition_splits_by_mode_and_drops_empty_people() {
        let all = vec![
            PersonTrips {
                person: PersonID("p1".to_string()),
                legs: vec![leg(100, TripMode::Walk), leg(200, TripMode::Car)],
            },
            PersonTrips {
                person: PersonID("p2".to_string()),
                legs: vec![leg(300, TripMode::Walk)],
            },
        ];

        let walk = TripDocument::partition(&all, TripMode::Walk);
        assert_eq!(walk.people.len(), 2);
        assert_eq!(walk.people[0].legs.len(), 1);

        let car = TripDocument::partition(&all, TripMode::Car);
        assert_eq!(car.people.len(), 1);
        assert_eq!(car.people[0].person, PersonID("p1".to_string()));

        let bike = TripDocument::partition(&all, TripMode::Bike);
        assert!(bike.people.is_empty());
    }
}
