//! The usual collection of utilities every other crate in this workspace winds up needing:
//! logging setup, progress timers with a worker-pool helper, small collection types, and
//! deterministic RNG forking.

mod collections;
pub mod logger;
mod random;
mod time;

pub use crate::collections::{Counter, MultiMap};
pub use crate::random::fork_rng;
pub use crate::time::{elapsed_seconds, prettyprint_time, prettyprint_usize, Timer};
