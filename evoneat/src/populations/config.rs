use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Configuration data for population generation
/// and evolution.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]. Using
/// values that are not in this bound may result
/// in odd behaviours and/or incorrect programs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Size of the population.
    pub size: NonZeroUsize,
    /// Seed for the population's random number
    /// generator. Runs with equal seeds and
    /// configurations evolve identically.
    pub seed: Option<u64>,
    /// Initial genetic distance threshold, beyond
    /// which genomes are considered as belonging
    /// to different species.
    pub compatibility_threshold: f32,
    /// Desired amount of species in the population.
    /// If zero, the compatibility threshold stays fixed.
    pub target_species: usize,
    /// Amount by which the compatibility threshold is
    /// nudged each generation towards `target_species`.
    pub threshold_step: f32,
    /// Lowest value the compatibility threshold
    /// may be nudged to.
    pub minimum_threshold: f32,
    /// Top n of each species which is copied
    /// as-is to the next generation.
    pub elitism: usize,
    /// Species smaller than this do not keep
    /// their elite (except for the population
    /// champion's species).
    pub elitism_min_species_size: usize,
    /// Top % of each species which can participate
    /// in mating.
    pub survival_threshold: f32,
    /// Chance that offspring will be the result
    /// of sexual reproduction (as opposed to asexual).
    pub sexual_reproduction_chance: f32,
    /// Chance that genomes from different species
    /// will be selected to mate.
    pub interspecies_mating_chance: f32,
    /// Number of generations without a fitness increase
    /// after which a species is barred from reproducing.
    pub stagnation_limit: NonZeroUsize,
    /// Fitness assigned to clients whose evaluation
    /// failed, timed out, or returned an invalid score.
    pub minimum_fitness: f32,
}

impl PopulationConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, empty, or in the case of
    /// `NonZeroUsize`s, 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to abbreviate configuration
    /// instantiation, or to fill in unused values.
    ///
    /// # Examples
    /// ```
    /// use evoneat::PopulationConfig;
    ///
    /// let cfg1 = PopulationConfig::zero();
    ///
    /// let cfg2 = PopulationConfig {
    ///     // Specify some values here...
    ///     elitism: 1,
    ///     // Default the rest...
    ///     ..PopulationConfig::zero()
    /// };
    /// ```
    pub const fn zero() -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::MIN,
            seed: None,
            compatibility_threshold: 0.0,
            target_species: 0,
            threshold_step: 0.0,
            minimum_threshold: 0.0,
            elitism: 0,
            elitism_min_species_size: 0,
            survival_threshold: 0.0,
            sexual_reproduction_chance: 0.0,
            interspecies_mating_chance: 0.0,
            stagnation_limit: NonZeroUsize::MIN,
            minimum_fitness: 0.0,
        }
    }
}

impl Default for PopulationConfig {
    /// Values close to the ones used in the
    /// original NEAT experiments.
    fn default() -> Self {
        PopulationConfig {
            size: NonZeroUsize::new(150).unwrap(),
            seed: None,
            compatibility_threshold: 3.0,
            target_species: 0,
            threshold_step: 0.3,
            minimum_threshold: 0.3,
            elitism: 1,
            elitism_min_species_size: 5,
            survival_threshold: 0.2,
            sexual_reproduction_chance: 0.75,
            interspecies_mating_chance: 0.001,
            stagnation_limit: NonZeroUsize::new(15).unwrap(),
            minimum_fitness: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_fall_back_to_defaults() {
        let config: PopulationConfig =
            serde_json::from_str(r#"{"size": 50, "seed": 7, "elitism": 2}"#).unwrap();
        assert_eq!(config.size.get(), 50);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.elitism, 2);
        assert_eq!(
            config.compatibility_threshold,
            PopulationConfig::default().compatibility_threshold
        );
    }

    #[test]
    fn defaults_follow_original_experiments() {
        let config = PopulationConfig::default();
        assert_eq!(config.size.get(), 150);
        assert_eq!(config.stagnation_limit.get(), 15);
    }
}
