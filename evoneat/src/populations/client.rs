use super::SpeciesID;
use crate::{Genome, Phenotype, PhenotypeError};

use rand::Rng;

/// A single evaluable individual of a population.
///
/// Owns its genome, lazily builds the genome's
/// phenotype, and carries the score the external
/// fitness harness reported for it.
#[derive(Debug, Clone)]
pub struct Client<G: Genome> {
    genome: G,
    phenotype: Option<G::Phenotype>,
    score: Option<f32>,
    adjusted_fitness: f32,
    species: Option<SpeciesID>,
}

impl<G: Genome> Client<G> {
    /// Wraps a genome into a fresh, unevaluated client.
    pub fn new(genome: G) -> Client<G> {
        Client {
            genome,
            phenotype: None,
            score: None,
            adjusted_fitness: 0.0,
            species: None,
        }
    }

    /// Returns the client's genome.
    pub fn genome(&self) -> &G {
        &self.genome
    }

    /// Consumes the client, returning its genome.
    pub fn into_genome(self) -> G {
        self.genome
    }

    /// Returns the client's phenotype, building it
    /// from the genome first if needed.
    ///
    /// # Errors
    /// Returns an error if the genome cannot be expressed.
    pub fn phenotype(&mut self, config: &G::Config) -> Result<&mut G::Phenotype, PhenotypeError<G>> {
        let phenotype = match self.phenotype.take() {
            Some(phenotype) => phenotype,
            None => self.genome.express(config)?,
        };
        Ok(self.phenotype.insert(phenotype))
    }

    /// Runs the client's phenotype on `inputs`.
    ///
    /// # Errors
    /// Returns an error if the phenotype cannot be
    /// built or rejects the inputs.
    pub fn calculate(&mut self, config: &G::Config, inputs: &[f32]) -> Result<Vec<f32>, PhenotypeError<G>> {
        self.phenotype(config)?.activate(inputs)
    }

    /// Returns the genetic distance between two clients.
    pub fn distance(&self, other: &Client<G>, config: &G::Config) -> f32 {
        G::genetic_distance(&self.genome, &other.genome, config)
    }

    /// Mutates the client's genome, discarding
    /// any previously built phenotype.
    pub fn mutate<R: Rng + ?Sized>(
        &mut self,
        history: &mut G::InnovationHistory,
        config: &G::Config,
        rng: &mut R,
    ) {
        self.genome.mutate(history, config, rng);
        self.phenotype = None;
    }

    /// Records the client's raw fitness score.
    pub fn set_score(&mut self, score: f32) {
        self.score = Some(score);
        self.genome.set_fitness(score);
    }

    /// Returns the client's raw fitness score,
    /// if it has been evaluated.
    pub fn score(&self) -> Option<f32> {
        self.score
    }

    /// Returns the client's raw fitness score,
    /// or 0 if it hasn't been evaluated.
    pub fn fitness(&self) -> f32 {
        self.score.unwrap_or(0.0)
    }

    /// Returns the client's fitness after
    /// sharing it with its species.
    pub fn adjusted_fitness(&self) -> f32 {
        self.adjusted_fitness
    }

    pub(super) fn set_adjusted_fitness(&mut self, adjusted_fitness: f32) {
        self.adjusted_fitness = adjusted_fitness;
    }

    /// Returns the species the client was last assigned to.
    pub fn species(&self) -> Option<SpeciesID> {
        self.species
    }

    pub(super) fn set_species(&mut self, species: SpeciesID) {
        self.species = Some(species);
    }

    pub(super) fn take_phenotype(&mut self) -> Option<G::Phenotype> {
        self.phenotype.take()
    }

    pub(super) fn restore_phenotype(&mut self, phenotype: G::Phenotype) {
        self.phenotype = Some(phenotype);
    }
}
