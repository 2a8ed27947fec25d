use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use schedutil::{prettyprint_usize, Counter, MultiMap, Timer};

use crate::distribution::Distributions;
use crate::{
    resolve_group, ActivityInterval, ItineraryError, Location, LocationDistribution, PersonID,
    SlotCfg, SlotGrid,
};

/// One (person, slot) entry. `stop` is None when nothing in the raw schedule covered the slot and
/// the gap filler hasn't run yet.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub stop: Option<Location>,
    /// Seconds of recorded presence attributed to this slot; 0 for absent or filled cells
    pub duration: usize,
}

/// The dense per-person, per-slot occupancy table. Every known person has exactly one cell per
/// slot, whether or not the raw data covered it.
pub struct Itinerary {
    cfg: SlotCfg,
    slot_starts: Vec<usize>,
    rows: BTreeMap<PersonID, Vec<Cell>>,
}

impl Itinerary {
    fn empty(cfg: SlotCfg, slot_starts: Vec<usize>, people: BTreeSet<PersonID>) -> Itinerary {
        let blank = vec![
            Cell {
                stop: None,
                duration: 0
            };
            slot_starts.len()
        ];
        Itinerary {
            cfg,
            slot_starts,
            rows: people.into_iter().map(|p| (p, blank.clone())).collect(),
        }
    }

    pub fn cfg(&self) -> &SlotCfg {
        &self.cfg
    }

    /// The start second of every slot, ascending.
    pub fn slot_starts(&self) -> &[usize] {
        &self.slot_starts
    }

    pub fn rows(&self) -> &BTreeMap<PersonID, Vec<Cell>> {
        &self.rows
    }

    pub fn num_people(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cells(&self) -> usize {
        self.rows.len() * self.slot_starts.len()
    }

    pub fn num_absent(&self) -> usize {
        self.rows
            .values()
            .flatten()
            .filter(|cell| cell.stop.is_none())
            .count()
    }

    pub(crate) fn set(&mut self, person: &PersonID, slot_idx: usize, cell: Cell) {
        self.rows.get_mut(person).unwrap()[slot_idx] = cell;
    }

    /// Writes the table as CSV {uid, timeslot, stop, duration}, one row per cell. Absent cells
    /// have an empty stop.
    pub fn write_csv(&self, path: &str) -> Result<()> {
        let mut writer = csv::Writer::from_writer(fs_err::File::create(path)?);
        for (person, row) in &self.rows {
            for (idx, cell) in row.iter().enumerate() {
                writer.serialize(CsvRow {
                    uid: person.0.clone(),
                    timeslot: self.slot_starts[idx],
                    stop: cell.stop.as_ref().map(|loc| loc.0.clone()),
                    duration: cell.duration,
                })?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads a table previously written by `write_csv`. The grid implied by `cfg` must match the
    /// file's timeslots exactly.
    pub fn read_csv(path: &str, cfg: SlotCfg) -> Result<Itinerary> {
        let grid = SlotGrid::new(&cfg)?;
        let slot_starts = grid.slot_starts().to_vec();
        let slot_idx: BTreeMap<usize, usize> = slot_starts
            .iter()
            .enumerate()
            .map(|(idx, start)| (*start, idx))
            .collect();

        let mut rows: BTreeMap<PersonID, Vec<Cell>> = BTreeMap::new();
        let blank = vec![
            Cell {
                stop: None,
                duration: 0
            };
            slot_starts.len()
        ];
        for rec in csv::Reader::from_reader(fs_err::File::open(path)?).deserialize() {
            let rec: CsvRow = rec.context("unreadable itinerary row")?;
            let idx = match slot_idx.get(&rec.timeslot) {
                Some(idx) => *idx,
                None => bail!(
                    "timeslot {} in {} doesn't belong to a {}s-wide grid over {}s",
                    rec.timeslot,
                    path,
                    cfg.slot_width,
                    cfg.horizon
                ),
            };
            rows.entry(PersonID(rec.uid)).or_insert_with(|| blank.clone())[idx] = Cell {
                stop: rec.stop.map(Location),
                duration: rec.duration,
            };
        }
        Ok(Itinerary {
            cfg,
            slot_starts,
            rows,
        })
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct CsvRow {
    uid: String,
    timeslot: usize,
    stop: Option<String>,
    duration: usize,
}

/// Orchestrates interval expansion and conflict resolution into the dense grid, and computes the
/// frequency statistics later stages lean on.
pub struct ItineraryBuilder {
    cfg: SlotCfg,
    grid: SlotGrid,
}

impl ItineraryBuilder {
    pub fn new(cfg: SlotCfg) -> Result<ItineraryBuilder, ItineraryError> {
        let grid = SlotGrid::new(&cfg)?;
        Ok(ItineraryBuilder { cfg, grid })
    }

    pub fn grid(&self) -> &SlotGrid {
        &self.grid
    }

    pub fn build(
        &self,
        intervals: &[ActivityInterval],
        timer: &mut Timer,
    ) -> (Itinerary, Distributions) {
        timer.start("expand intervals into slot records");
        let mut people = BTreeSet::new();
        let mut groups = MultiMap::new();
        for interval in intervals {
            people.insert(interval.person.clone());
            match self.grid.expand(
                &interval.person,
                &interval.location,
                interval.start,
                interval.end,
            ) {
                Ok(records) => {
                    for r in records {
                        groups.insert((r.person.clone(), r.slot), r);
                    }
                }
                Err(err) => {
                    warn!("skipping interval for {}: {}", interval.person, err);
                }
            }
        }
        timer.stop("expand intervals into slot records");

        // The tie-break signal has to exist before resolution, so it only counts slots with an
        // unambiguous location.
        timer.start("resolve conflicting slots");
        let mut tiebreak_counts: BTreeMap<PersonID, Counter<Location>> = BTreeMap::new();
        for ((person, _), records) in groups.borrow() {
            if records.len() == 1 {
                tiebreak_counts
                    .entry(person.clone())
                    .or_insert_with(Counter::new)
                    .inc(records[0].location.clone());
            }
        }
        let tiebreak: BTreeMap<PersonID, LocationDistribution> = tiebreak_counts
            .iter()
            .filter_map(|(p, counter)| {
                LocationDistribution::from_counter(counter).map(|d| (p.clone(), d))
            })
            .collect();

        let mut resolved: Vec<SlotWinner> = Vec::new();
        let mut conflicts = 0;
        for ((person, slot), records) in groups.consume() {
            if records.len() > 1 {
                conflicts += 1;
            }
            if let Some(winner) = resolve_group(records, tiebreak.get(&person)) {
                resolved.push(SlotWinner {
                    person,
                    slot,
                    location: winner.location,
                    duration: winner.duration,
                });
            }
        }
        if conflicts > 0 {
            timer.note(format!(
                "resolved {} slots with conflicting activities",
                prettyprint_usize(conflicts)
            ));
        }
        timer.stop("resolve conflicting slots");

        // value_counts over each person's resolved slots, plus the population-wide aggregate
        timer.start("compute location distributions");
        let mut per_person_counts: BTreeMap<PersonID, Counter<Location>> = BTreeMap::new();
        let mut population_counts = Counter::new();
        for w in &resolved {
            per_person_counts
                .entry(w.person.clone())
                .or_insert_with(Counter::new)
                .inc(w.location.clone());
            population_counts.inc(w.location.clone());
        }
        let dists = Distributions {
            per_person: per_person_counts
                .iter()
                .filter_map(|(p, counter)| {
                    LocationDistribution::from_counter(counter).map(|d| (p.clone(), d))
                })
                .collect(),
            population: LocationDistribution::from_counter(&population_counts),
        };
        timer.stop("compute location distributions");

        // Dense means dense: every person x slot cell exists, matched or not.
        timer.start("materialize the dense grid");
        let mut itinerary =
            Itinerary::empty(self.cfg, self.grid.slot_starts().to_vec(), people);
        for w in resolved {
            let idx = w.slot / self.cfg.slot_width;
            itinerary.set(
                &w.person,
                idx,
                Cell {
                    stop: Some(w.location),
                    duration: w.duration,
                },
            );
        }
        timer.stop("materialize the dense grid");
        timer.note(format!(
            "{} people x {} slots, {} cells absent before gap filling",
            prettyprint_usize(itinerary.num_people()),
            prettyprint_usize(itinerary.slot_starts().len()),
            prettyprint_usize(itinerary.num_absent())
        ));

        (itinerary, dists)
    }
}

struct SlotWinner {
    person: PersonID,
    slot: usize,
    location: Location,
    duration: usize,
}
