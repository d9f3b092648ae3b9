use crate::networks::ActivationType;

use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// Configuration data for genome generation
/// and inter-genome operations.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]. Using
/// values that are not in this bound may result
/// in odd behaviours and/or incorrect programs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticConfig {
    /// Number of inputs in a genome.
    pub input_count: NonZeroUsize,
    /// Number of outputs in a genome.
    pub output_count: NonZeroUsize,
    /// Whether genomes carry a bias node.
    pub bias: bool,
    /// Constant output of the bias node.
    pub bias_value: f32,
    /// Activation function applied to every
    /// non-sensor node.
    pub activation: ActivationType,
    /// Probability that each input-output pair is
    /// connected in a newly generated genome.
    pub initial_expression_chance: f32,
    /// Maximum magnitude of a connection weight.
    pub weight_bound: f32,
    /// Probability that a connection's weight is
    /// perturbed during weight mutation.
    pub weight_perturb_chance: f32,
    /// Standard deviation of weight perturbations.
    pub weight_perturb_power: f32,
    /// Probability that an unperturbed connection's
    /// weight is replaced with a random one.
    pub weight_reset_chance: f32,
    /// Probability of an add-connection mutation.
    pub connection_addition_chance: f32,
    /// Maximum number of node pairs tried by an
    /// add-connection mutation.
    pub max_connection_addition_attempts: usize,
    /// Whether connections may form cycles.
    pub allow_recurrent: bool,
    /// Probability of an add-node mutation.
    pub node_addition_chance: f32,
    /// Probability of flipping the enabled
    /// flag of a random connection.
    pub toggle_enable_chance: f32,
    /// Probability that a gene disabled in either
    /// parent is enabled in their offspring.
    pub reactivation_chance: f32,
    /// Probability that a child's matching genes
    /// take the average of their parents' weights.
    pub mate_by_averaging_chance: f32,
    /// Genetic distance coefficient of excess genes.
    pub excess_gene_factor: f32,
    /// Genetic distance coefficient of disjoint genes.
    pub disjoint_gene_factor: f32,
    /// Genetic distance coefficient of the mean
    /// weight difference of matching genes.
    pub common_weight_factor: f32,
    /// Genomes with fewer genes than this are not
    /// normalized by size when computing distances.
    pub small_genome_threshold: usize,
    /// Relaxation ticks used to evaluate recurrent
    /// networks. 0 estimates them from network depth.
    pub relaxation_ticks: usize,
}

impl GeneticConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, false, or in the case of
    /// `NonZeroUsize`s, 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to abbreviate configuration
    /// instantiation, or to fill in unused values.
    ///
    /// # Examples
    /// ```
    /// use evoneat_nn::genomics::GeneticConfig;
    ///
    /// let cfg1 = GeneticConfig::zero();
    ///
    /// let cfg2 = GeneticConfig {
    ///     // Specify some values here...
    ///     weight_bound: 5.0,
    ///     // Default the rest...
    ///     ..GeneticConfig::zero()
    /// };
    /// ```
    pub const fn zero() -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::MIN,
            output_count: NonZeroUsize::MIN,
            bias: false,
            bias_value: 0.0,
            activation: ActivationType::Sigmoid,
            initial_expression_chance: 0.0,
            weight_bound: 0.0,
            weight_perturb_chance: 0.0,
            weight_perturb_power: 0.0,
            weight_reset_chance: 0.0,
            connection_addition_chance: 0.0,
            max_connection_addition_attempts: 0,
            allow_recurrent: false,
            node_addition_chance: 0.0,
            toggle_enable_chance: 0.0,
            reactivation_chance: 0.0,
            mate_by_averaging_chance: 0.0,
            excess_gene_factor: 0.0,
            disjoint_gene_factor: 0.0,
            common_weight_factor: 0.0,
            small_genome_threshold: 0,
            relaxation_ticks: 0,
        }
    }

    /// Returns the number of sensor nodes
    /// (inputs plus bias) of a genome.
    pub fn sensor_count(&self) -> usize {
        self.input_count.get() + usize::from(self.bias)
    }
}

impl Default for GeneticConfig {
    /// Values close to the ones used in the
    /// original NEAT experiments.
    fn default() -> Self {
        GeneticConfig {
            input_count: NonZeroUsize::MIN,
            output_count: NonZeroUsize::MIN,
            bias: true,
            bias_value: 1.0,
            activation: ActivationType::SteepenedSigmoid,
            initial_expression_chance: 1.0,
            weight_bound: 5.0,
            weight_perturb_chance: 0.8,
            weight_perturb_power: 0.5,
            weight_reset_chance: 0.5,
            connection_addition_chance: 0.05,
            max_connection_addition_attempts: 20,
            allow_recurrent: false,
            node_addition_chance: 0.03,
            toggle_enable_chance: 0.01,
            reactivation_chance: 0.25,
            mate_by_averaging_chance: 0.4,
            excess_gene_factor: 1.0,
            disjoint_gene_factor: 1.0,
            common_weight_factor: 0.4,
            small_genome_threshold: 20,
            relaxation_ticks: 0,
        }
    }
}
