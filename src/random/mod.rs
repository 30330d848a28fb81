//! Random Primitives: weighted-categorical, Bernoulli, uniform, binomial and log-normal draws used
//! by the simulator, plus construction of independent, reproducible random streams.
//!
//! Nothing in this crate holds a global generator. Every entry point takes a `&mut R` where
//! `R: Rng`, so determinism comes from seeding a stream once, outside the core, and passing it
//! down. Units of work that should not share a stream (pipeline stages, parallel workers) get a
//! child stream from [`fork_stream`].
mod discrete;
mod sampling;

pub use discrete::DiscreteTable;
pub use sampling::RngSamplingExt;

use log::trace;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use xxhash_rust::xxh3::xxh3_64;

/// The generator used for every stream the crate creates itself.
pub type OutbreakRng = SmallRng;

/// A convenience method to compute the hash of a `&str`.
#[must_use]
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}

/// Creates a stream seeded from `base_seed` offset by the hash of `label`, so that differently
/// labelled streams built from the same base seed are independent.
#[must_use]
pub fn seeded_stream(base_seed: u64, label: &str) -> OutbreakRng {
    trace!("creating new RNG (seed={base_seed}) for stream {label}");
    OutbreakRng::seed_from_u64(base_seed.wrapping_add(hash_str(label)))
}

/// Derives an independent child stream from `parent`. Consumes exactly one `u64` from the parent.
pub fn fork_stream<R: Rng>(parent: &mut R, label: &str) -> OutbreakRng {
    let base_seed = parent.next_u64();
    seeded_stream(base_seed, label)
}
