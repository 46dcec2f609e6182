use rand::{rngs::StdRng, SeedableRng};

fn env_seed() -> Option<u64> {
    std::env::var("SEED").ok().and_then(|s| s.trim().parse().ok())
}

/// Create a [`StdRng`] from `seed`, falling back to `SEED` and then to OS
/// entropy. The same seed always yields the same weight initialisation.
pub fn seeded(seed: Option<u64>) -> StdRng {
    match seed.or_else(env_seed) {
        Some(s) => {
            log::debug!("seeding RNG with {s}");
            StdRng::seed_from_u64(s)
        }
        None => StdRng::from_entropy(),
    }
}
