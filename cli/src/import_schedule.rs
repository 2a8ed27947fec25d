use anyhow::Result;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;

use itinerary::{fill_gaps, read_raw_schedule, FillPolicy, Itinerary, ItineraryBuilder, SlotCfg};
use schedutil::{prettyprint_usize, Timer};

pub fn run(
    schedule: String,
    output: String,
    cfg: SlotCfg,
    fill_policy: FillPolicy,
    rng_seed: u64,
) -> Result<()> {
    let mut timer = Timer::new("build dense itinerary");
    let itinerary = build(&schedule, cfg, fill_policy, rng_seed, &mut timer)?;
    itinerary.write_csv(&output)?;
    println!(
        "Wrote {} cells for {} people to {}",
        prettyprint_usize(itinerary.num_cells()),
        prettyprint_usize(itinerary.num_people()),
        output
    );
    Ok(())
}

/// Raw schedule to dense itinerary: expand the activity intervals onto the slot grid, resolve
/// conflicts, and fill everyone's gaps. People without enough data to fill stay partially absent;
/// their trips will fail later without stopping anyone else's.
pub fn build(
    schedule: &str,
    cfg: SlotCfg,
    fill_policy: FillPolicy,
    rng_seed: u64,
    timer: &mut Timer,
) -> Result<Itinerary> {
    let intervals = read_raw_schedule(schedule, timer)?;
    let builder = ItineraryBuilder::new(cfg)?;
    let (mut itinerary, dists) = builder.build(&intervals, timer);

    let mut rng = XorShiftRng::seed_from_u64(rng_seed);
    let failures = fill_gaps(&mut itinerary, &dists, fill_policy, &mut rng, timer);
    for (person, err) in &failures {
        warn!("couldn't fill gaps for {}: {}", person, err);
    }
    timer.note(format!(
        "filled gaps for {} people, {} left incomplete",
        prettyprint_usize(itinerary.num_people() - failures.len()),
        prettyprint_usize(failures.len())
    ));
    Ok(itinerary)
}
