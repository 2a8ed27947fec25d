//! A collection of tools for turning sparse activity schedules into dense itineraries and trip
//! lists. These are bundled as a single executable to reduce the cost of static linking in the
//! release's file size.

#[macro_use]
extern crate log;

mod generate_trips;
mod import_schedule;
mod network;

use anyhow::Result;
use structopt::StructOpt;

use itinerary::{FillPolicy, SlotCfg};

#[derive(StructOpt)]
#[structopt(name = "itincli", about = "The itinerary engine multi-tool")]
enum Command {
    /// Turns a raw activity schedule into a dense itinerary, with every person assigned a stop in
    /// every time slot, and writes it as CSV.
    ImportSchedule {
        /// The path to a raw schedule CSV with uid, day, start_time, end_time, location columns
        #[structopt(long)]
        schedule: String,
        /// The CSV file to write the dense itinerary to
        #[structopt(long)]
        output: String,
        #[structopt(flatten)]
        slots: SlotOpts,
        /// How to fill a person's uncovered slots: "independent" draws each slot on its own,
        /// "shared" keeps repeated gaps at the same stop
        #[structopt(long, default_value = "independent")]
        fill_policy: FillPolicy,
        /// A seed for generating random numbers
        #[structopt(long, default_value = "42")]
        rng_seed: u64,
    },
    /// Derives per-person trips from a dense itinerary and writes one JSON document per travel
    /// mode.
    GenerateTrips {
        /// The path to a dense itinerary CSV, as written by import-schedule
        #[structopt(long)]
        itinerary: String,
        /// The path to a location table CSV with location and vertices columns
        #[structopt(long)]
        locations: String,
        /// The path to a road network CSV with edge, lon, lat, pedestrian, vehicle columns
        #[structopt(long)]
        network: String,
        /// The directory to write walk.json, bike.json, car.json to
        #[structopt(long)]
        out_dir: String,
        #[structopt(flatten)]
        slots: SlotOpts,
        #[structopt(flatten)]
        trips: TripOpts,
        /// A seed for generating random numbers
        #[structopt(long, default_value = "42")]
        rng_seed: u64,
    },
    /// Runs the whole pipeline: raw schedule in, per-mode trip documents out.
    Run {
        /// The path to a raw schedule CSV with uid, day, start_time, end_time, location columns
        #[structopt(long)]
        schedule: String,
        /// The path to a location table CSV with location and vertices columns
        #[structopt(long)]
        locations: String,
        /// The path to a road network CSV with edge, lon, lat, pedestrian, vehicle columns
        #[structopt(long)]
        network: String,
        /// The directory to write walk.json, bike.json, car.json to
        #[structopt(long)]
        out_dir: String,
        #[structopt(flatten)]
        slots: SlotOpts,
        #[structopt(flatten)]
        trips: TripOpts,
        /// How to fill a person's uncovered slots
        #[structopt(long, default_value = "independent")]
        fill_policy: FillPolicy,
        /// A seed for generating random numbers
        #[structopt(long, default_value = "42")]
        rng_seed: u64,
    },
}

#[derive(StructOpt)]
struct SlotOpts {
    /// The width of one time slot, in seconds
    #[structopt(long, default_value = "3600")]
    slot_width: usize,
    /// The total scheduling horizon, in seconds. Must be a multiple of the slot width.
    #[structopt(long, default_value = "432000")]
    horizon: usize,
    /// How many slots on either side of a gap to consult when filling it
    #[structopt(long, default_value = "2")]
    neighbor_radius: usize,
}

impl SlotOpts {
    fn cfg(&self) -> SlotCfg {
        SlotCfg {
            slot_width: self.slot_width,
            horizon: self.horizon,
            neighbor_radius: self.neighbor_radius,
        }
    }
}

#[derive(StructOpt)]
struct TripOpts {
    /// How far from a location's center to look for network edges, in meters
    #[structopt(long, default_value = "300.0")]
    radius: f64,
    /// The most edges to keep per location and mode
    #[structopt(long, default_value = "8")]
    max_neighbors: usize,
    /// How to pick a travel mode per trip: "walk" or "distance"
    #[structopt(long, default_value = "walk")]
    mode_policy: String,
}

fn main() -> Result<()> {
    schedutil::logger::setup();

    // Short implementations can stay in this file, but please split larger subcommands to their
    // own module.
    match Command::from_args() {
        Command::ImportSchedule {
            schedule,
            output,
            slots,
            fill_policy,
            rng_seed,
        } => import_schedule::run(schedule, output, slots.cfg(), fill_policy, rng_seed)?,
        Command::GenerateTrips {
            itinerary,
            locations,
            network,
            out_dir,
            slots,
            trips,
            rng_seed,
        } => generate_trips::run(
            itinerary,
            locations,
            network,
            out_dir,
            slots.cfg(),
            trips,
            rng_seed,
        )?,
        Command::Run {
            schedule,
            locations,
            network,
            out_dir,
            slots,
            trips,
            fill_policy,
            rng_seed,
        } => {
            let mut timer = schedutil::Timer::new("run the itinerary pipeline");
            let itinerary =
                import_schedule::build(&schedule, slots.cfg(), fill_policy, rng_seed, &mut timer)?;
            generate_trips::derive(
                &itinerary, &locations, &network, &out_dir, &trips, rng_seed, &mut timer,
            )?;
        }
    }
    Ok(())
}
