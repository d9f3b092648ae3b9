use crate::genomics::GeneticConfig;
use crate::Innovation;

use std::fmt;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Anything carrying a historical marker,
/// used to align genes between genomes.
pub trait Gene {
    fn innovation(&self) -> Innovation;
}

/// Connection genes are the principal components of genomes.
/// They are created between two nodes, and become
/// network connections in the genome's phenotype.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ConnectionGene {
    id: Innovation,
    input: Innovation,
    output: Innovation,
    weight: f32,
    enabled: bool,
}

impl ConnectionGene {
    /// Returns a new _enabled_ gene with the specified parameters.
    ///
    /// # Examples
    /// ```
    /// use evoneat_nn::genomics::ConnectionGene;
    ///
    /// let gene = ConnectionGene::new(42, 3, 9, 2.0);
    /// assert!(gene.enabled());
    /// ```
    pub fn new(id: Innovation, input: Innovation, output: Innovation, weight: f32) -> ConnectionGene {
        ConnectionGene {
            id,
            input,
            output,
            weight,
            enabled: true,
        }
    }

    /// Returns a random weight. Uses a uniform distribution
    /// over the range ±[`weight_bound`].
    ///
    /// [`weight_bound`]: crate::genomics::GeneticConfig::weight_bound
    pub fn random_weight<R: Rng + ?Sized>(config: &GeneticConfig, rng: &mut R) -> f32 {
        let bound = config.weight_bound.abs();
        rng.gen_range(-bound..=bound)
    }

    /// Replaces the gene's weight with a random one.
    pub fn randomize_weight<R: Rng + ?Sized>(&mut self, config: &GeneticConfig, rng: &mut R) {
        self.weight = Self::random_weight(config, rng);
    }

    /// Perturbs the gene's weight by a normally distributed
    /// amount with a standard deviation of [`weight_perturb_power`].
    /// The result is clamped to ±[`weight_bound`].
    ///
    /// [`weight_perturb_power`]: crate::genomics::GeneticConfig::weight_perturb_power
    /// [`weight_bound`]: crate::genomics::GeneticConfig::weight_bound
    ///
    /// # Examples
    /// ```
    /// use evoneat_nn::genomics::{ConnectionGene, GeneticConfig};
    ///
    /// let mut gene = ConnectionGene::new(42, 3, 9, 4.5);
    /// let mut rng = evoneat::rng::seeded(Some(5));
    ///
    /// gene.perturb_weight(&GeneticConfig {
    ///     weight_perturb_power: 2.5,
    ///     weight_bound: 5.0,
    ///     ..GeneticConfig::zero()
    /// }, &mut rng);
    ///
    /// assert!(gene.weight().abs() <= 5.0);
    /// ```
    pub fn perturb_weight<R: Rng + ?Sized>(&mut self, config: &GeneticConfig, rng: &mut R) {
        let bound = config.weight_bound.abs();
        if let Ok(normal) = Normal::new(0.0, config.weight_perturb_power.abs()) {
            self.weight = (self.weight + normal.sample(rng)).clamp(-bound, bound);
        }
    }

    /// Returns the gene's input node.
    pub fn input(&self) -> Innovation {
        self.input
    }

    /// Returns the gene's output node.
    pub fn output(&self) -> Innovation {
        self.output
    }

    /// Returns the gene's (input, output) node pair.
    pub fn endpoints(&self) -> (Innovation, Innovation) {
        (self.input, self.output)
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight;
    }

    /// Returns whether the gene is expressed in
    /// the genome's phenotype.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Flips the gene's enabled status.
    pub fn toggle_enabled(&mut self) {
        self.enabled = !self.enabled;
    }
}

impl Gene for ConnectionGene {
    fn innovation(&self) -> Innovation {
        self.id
    }
}

impl fmt::Display for ConnectionGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let gene = format!(
            "{}[{}->{}, {:.4}]",
            self.id, self.input, self.output, self.weight
        );
        if self.enabled {
            write!(f, "{}", gene)
        } else {
            write!(f, "({})", gene)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn random_weights_respect_bound() {
        let config = GeneticConfig {
            weight_bound: 2.0,
            ..GeneticConfig::zero()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..1000 {
            assert!(ConnectionGene::random_weight(&config, &mut rng).abs() <= 2.0);
        }
    }

    #[test]
    fn perturbation_is_clamped() {
        let config = GeneticConfig {
            weight_bound: 1.0,
            weight_perturb_power: 10.0,
            ..GeneticConfig::zero()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut gene = ConnectionGene::new(0, 0, 1, 0.0);
        for _ in 0..100 {
            gene.perturb_weight(&config, &mut rng);
            assert!(gene.weight().abs() <= 1.0);
        }
    }

    #[test]
    fn disabled_genes_display_in_parentheses() {
        let mut gene = ConnectionGene::new(4, 1, 2, 0.5);
        assert_eq!(gene.to_string(), "4[1->2, 0.5000]");
        gene.toggle_enabled();
        assert_eq!(gene.to_string(), "(4[1->2, 0.5000])");
    }
}
