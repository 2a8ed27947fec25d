use rand::{RngCore, SeedableRng};
use rand_xorshift::XorShiftRng;

/// Splits a new RNG off of a base one. Workers processing different people each get their own
/// fork, so adding or removing one person never perturbs anyone else's random draws.
pub fn fork_rng(base_rng: &mut XorShiftRng) -> XorShiftRng {
    XorShiftRng::seed_from_u64(base_rng.next_u64())
}
