use anyhow::{bail, Result};
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;

use itinerary::{Itinerary, SlotCfg};
use schedutil::{prettyprint_usize, Timer};
use tripgen::{
    derive_all, write_trip_files, AlwaysWalk, DistanceThreshold, EdgeCache, LocationTable,
    ModeChoice,
};

use crate::network::CsvNetwork;
use crate::TripOpts;

pub fn run(
    itinerary: String,
    locations: String,
    network: String,
    out_dir: String,
    cfg: SlotCfg,
    opts: TripOpts,
    rng_seed: u64,
) -> Result<()> {
    let mut timer = Timer::new("generate trips");
    let itinerary = Itinerary::read_csv(&itinerary, cfg)?;
    derive(
        &itinerary, &locations, &network, &out_dir, &opts, rng_seed, &mut timer,
    )
}

pub fn derive(
    itinerary: &Itinerary,
    locations: &str,
    network: &str,
    out_dir: &str,
    opts: &TripOpts,
    rng_seed: u64,
    timer: &mut Timer,
) -> Result<()> {
    let table = LocationTable::load(locations)?;
    let net = CsvNetwork::load(network, timer)?;

    let mut edges = EdgeCache::new(opts.radius, opts.max_neighbors);
    edges.warm(&net, &table, timer);

    let policy: Box<dyn ModeChoice> = match opts.mode_policy.as_str() {
        "walk" => Box::new(AlwaysWalk),
        "distance" => Box::new(DistanceThreshold::new(table.centers())),
        x => bail!("unknown mode policy {}", x),
    };

    let mut rng = XorShiftRng::seed_from_u64(rng_seed);
    let (trips, failures) = derive_all(itinerary, &edges, &*policy, &mut rng, timer);
    write_trip_files(&trips, out_dir)?;
    println!(
        "Derived trips for {} people ({} failed), wrote documents to {}",
        prettyprint_usize(trips.len()),
        prettyprint_usize(failures.len()),
        out_dir
    );
    Ok(())
}
