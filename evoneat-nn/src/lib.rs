//! # evoneat-nn
//! A neural network implementation of the `evoneat` crate's `Genome` trait.
//!
//! Provides the [`NNGenome`] type usable in `evoneat` `Population`s, the
//! [`InnovationTracker`] which keeps its historical markers consistent
//! across a population, and the [`Calculator`] network built from it.
//! Genomes can be exported to and imported from any serde format through
//! [`GenomeSnapshot`].
//!
//! [`NNGenome`]: crate::genomics::NNGenome
//! [`InnovationTracker`]: crate::genomics::InnovationTracker
//! [`Calculator`]: crate::networks::Calculator
//! [`GenomeSnapshot`]: crate::genomics::GenomeSnapshot
//!
//! # Example usage: evolution of a XOR approximator
//! ```
//! use evoneat::{Phenotype, Population, PopulationConfig};
//! use evoneat_nn::{
//!     genomics::{GeneticConfig, NNGenome},
//!     networks::Calculator,
//! };
//! use std::num::NonZeroUsize;
//!
//! fn evaluate_xor(_: &NNGenome, network: &mut Calculator) -> f32 {
//!     let values = [
//!         ([0.0, 0.0], 0.0),
//!         ([0.0, 1.0], 1.0),
//!         ([1.0, 0.0], 1.0),
//!         ([1.0, 1.0], 0.0),
//!     ];
//!
//!     let mut error = 0.0;
//!     for (input, output) in values.iter() {
//!         match network.activate(input) {
//!             Ok(result) => error += (result[0] - output).abs(),
//!             Err(_) => return 0.0,
//!         }
//!     }
//!
//!     (4.0 - error).powf(2.0)
//! }
//!
//! let genetic_config = GeneticConfig {
//!     input_count: NonZeroUsize::new(2).unwrap(),
//!     output_count: NonZeroUsize::new(1).unwrap(),
//!     ..GeneticConfig::default()
//! };
//!
//! let population_config = PopulationConfig {
//!     size: NonZeroUsize::new(150).unwrap(),
//!     seed: Some(42),
//!     ..PopulationConfig::default()
//! };
//!
//! let mut population = Population::<NNGenome>::new(population_config, genetic_config);
//! for _ in 0..20 {
//!     population.evaluate_fitness(evaluate_xor);
//!     if population.champion().fitness() > 15.0 {
//!         let champion = population.champion().genome();
//!         println!("Solution found!: {}", serde_json::to_string(champion).unwrap());
//!         break;
//!     }
//!     population.evolve().unwrap();
//! }
//! ```

pub mod genomics;
pub mod networks;

/// Identifier type used to designate historically
/// identical mutations for the purposes of
/// genome comparison and genetic tracking.
pub type Innovation = usize;
