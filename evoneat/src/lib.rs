//! A generational implementation of NeuroEvolution of Augmenting Topologies,
//! following the 2002 paper: <http://nn.cs.utexas.edu/keyword?stanley:ec02>
//!
//! The driver is generic over the genome encoding through the [`Genome`],
//! [`InnovationHistory`] and [`Phenotype`] traits. A population of
//! [`Client`]s is evaluated by an external fitness function (sequentially,
//! on rayon's thread pool, or under a deadline), grouped into species by
//! genetic distance, and bred into the next generation with explicit
//! fitness sharing, elitism and stagnation control. A neural network
//! genome, as in the original algorithm, is supplied by the `evoneat-nn`
//! crate.
//!
//! All randomness of a population flows from a single generator, so
//! runs configured with the same [seed] are reproducible.
//!
//! [seed]: PopulationConfig::seed
//!
//! # Example usage: evolving a network whose output approaches 1.0
//! ```
//! use evoneat::{Phenotype, Population, PopulationConfig};
//! use evoneat_nn::genomics::{GeneticConfig, NNGenome};
//! use evoneat_nn::networks::{ActivationType, Calculator};
//! use std::num::NonZeroUsize;
//!
//! fn evaluate(_: &NNGenome, network: &mut Calculator) -> f32 {
//!     match network.activate(&[0.5, -0.5]) {
//!         Ok(outputs) => 1.0 - (1.0 - outputs[0]).abs(),
//!         Err(_) => 0.0,
//!     }
//! }
//!
//! let genetic_config = GeneticConfig {
//!     input_count: NonZeroUsize::new(2).unwrap(),
//!     output_count: NonZeroUsize::new(1).unwrap(),
//!     activation: ActivationType::Sigmoid,
//!     ..GeneticConfig::default()
//! };
//!
//! let population_config = PopulationConfig {
//!     size: NonZeroUsize::new(50).unwrap(),
//!     seed: Some(2002),
//!     ..PopulationConfig::default()
//! };
//!
//! let mut population = Population::<NNGenome>::new(population_config, genetic_config);
//! let mut best = 0.0;
//! for _ in 0..10 {
//!     population.evaluate_fitness(evaluate);
//!     let stats = population.evolve().unwrap();
//!     assert!(stats.best_fitness >= best);
//!     best = stats.best_fitness;
//! }
//! ```

mod genome;
pub mod populations;
pub mod rng;
#[cfg(test)]
pub(crate) mod testing;

pub use genome::*;
pub use populations::{
    Client, Phase, Population, PopulationConfig, PopulationError, Species, SpeciesID,
};
