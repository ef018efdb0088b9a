//! Deterministic per-run random number generation
//!
//! Every run owns a private PRNG seeded from `(base_seed, run_index)` via a
//! fixed splitmix64 mixer. Nothing else in the crate creates randomness, so
//! for a fixed `(model, base_seed)` each run's decision sequence is a pure
//! function of its index, regardless of how runs are scheduled across
//! threads.
//!
//! The generator is ChaCha8: portable (identical streams on every platform)
//! and cheaply seedable per run.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// The per-run generator type.
pub type RunRng = ChaCha8Rng;

/// Mix a base seed and run index into an independent per-run seed.
///
/// Uses the splitmix64 finalizer, so consecutive run indices land far apart
/// in seed space.
///
/// # Example
/// ```
/// use latencylab::rng::mix_seed;
///
/// assert_eq!(mix_seed(123, 0), mix_seed(123, 0));
/// assert_ne!(mix_seed(123, 0), mix_seed(123, 1));
/// ```
pub fn mix_seed(base_seed: u64, run_index: u32) -> u64 {
    splitmix64(base_seed ^ run_index as u64)
}

/// Create the RNG for a single run.
pub fn rng_for_seed(seed: u64) -> RunRng {
    ChaCha8Rng::seed_from_u64(seed)
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = rng_for_seed(mix_seed(42, 7));
        let mut b = rng_for_seed(mix_seed(42, 7));
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64(), "RNG stream not deterministic");
        }
    }

    #[test]
    fn test_run_indices_get_distinct_seeds() {
        let seeds: Vec<u64> = (0..100).map(|i| mix_seed(1, i)).collect();
        let mut unique = seeds.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), seeds.len(), "seed mixer collided");
    }

    #[test]
    fn test_zero_base_seed_is_usable() {
        let mut rng = rng_for_seed(mix_seed(0, 0));
        // Just exercise the stream; splitmix64(0) is a well-defined nonzero seed.
        let _ = rng.next_u64();
        assert_ne!(mix_seed(0, 0), 0);
    }

    #[test]
    fn test_mixer_is_sensitive_to_base_seed() {
        assert_ne!(mix_seed(1, 0), mix_seed(2, 0));
    }
}
