use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Random number generator driving every
/// stochastic step of a population's evolution.
pub type EvolutionRng = ChaCha8Rng;

/// Returns a generator seeded with `seed`,
/// or with a random seed if `None`.
///
/// # Examples
/// ```
/// use evoneat::rng::seeded;
/// use rand::Rng;
///
/// let a: u32 = seeded(Some(7)).gen();
/// let b: u32 = seeded(Some(7)).gen();
/// assert_eq!(a, b);
/// ```
pub fn seeded(seed: Option<u64>) -> EvolutionRng {
    ChaCha8Rng::seed_from_u64(seed.unwrap_or_else(rand::random))
}
