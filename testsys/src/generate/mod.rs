//! Seeded test-case generation.
//!
//! A [`Gen`] is a function of the run's random source. Generators compose
//! through [`Gen::repeat`], [`Gen::map`], [`Gen::and_then`] and
//! [`Gen::retry_until`]; [`ArgList`] evaluates a mix of literal and generated
//! argument slots into one [`Arguments`] value.

mod args;
mod gen;
mod random;

pub use args::{ArgList, Arguments, Slot, TestCase};
pub use gen::Gen;
pub use random::{
    distinct, random_float, random_integer, random_permutation, random_string, repeat_test,
};

pub use rand::rngs::StdRng;
pub use rand::SeedableRng;

/// The random source a run's tests are drawn from.
pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
