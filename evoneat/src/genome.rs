use rand::Rng;

/// An interface for genomes that can be used by NEAT.
pub trait Genome: Clone {
    type Config;
    type InnovationHistory: InnovationHistory<Config = Self::Config>;
    type Phenotype: Phenotype;

    /// Returns a randomized minimal genome.
    fn new<R: Rng + ?Sized>(config: &Self::Config, rng: &mut R) -> Self;

    /// Returns the genetic distance between two genomes.
    ///
    /// Must be symmetric, non-negative, and zero
    /// for a genome and its clone.
    fn genetic_distance(first: &Self, second: &Self, config: &Self::Config) -> f32;

    /// Combines two genomes and returns a "child" genome,
    /// using each parent's recorded fitness to decide
    /// the inheritance of unmatched genes.
    ///
    /// Mating never introduces new structural innovations.
    fn mate<R: Rng + ?Sized>(
        parent1: &Self,
        parent2: &Self,
        config: &Self::Config,
        rng: &mut R,
    ) -> Self;

    /// Applies a round of random mutations to the genome,
    /// registering any structural changes in `history`.
    fn mutate<R: Rng + ?Sized>(
        &mut self,
        history: &mut Self::InnovationHistory,
        config: &Self::Config,
        rng: &mut R,
    );

    /// Builds the evaluable form of the genome.
    fn express(&self, config: &Self::Config) -> Result<Self::Phenotype, PhenotypeError<Self>>;

    /// Checks whether the genome is compatible with the
    /// specified configuration (e.g. has the configured
    /// number of inputs and outputs).
    fn conforms_to(&self, config: &Self::Config) -> bool;

    /// Makes sure `history` never hands out markers
    /// already in use by this genome. Called for genomes
    /// not produced through `history` itself.
    fn advance_history(&self, history: &mut Self::InnovationHistory);

    /// Sets the genome's fitness value.
    ///
    /// Should make sure that the fitness value is ≥0;
    /// otherwise NEAT will probably break.
    fn set_fitness(&mut self, fitness: f32);

    /// Returns the genome's fitness value.
    fn fitness(&self) -> f32;
}

/// An Innovation History is used to keep track
/// of genetic innovations throught successive
/// generations of genomes.
///
/// The exact function and utility of the
/// InnovationHistory is left to the implementor,
/// but structural mutations sharing a generation
/// are expected to share their markers.
pub trait InnovationHistory {
    type Config;

    fn new(config: &Self::Config) -> Self;

    /// Forgets the structural mutations seen during
    /// the current generation. Counters must keep
    /// increasing regardless.
    fn reset_generation_cache(&mut self);
}

/// The evaluable form of a genome, mapping
/// input vectors to output vectors.
pub trait Phenotype {
    type Error: std::error::Error;

    fn activate(&mut self, inputs: &[f32]) -> Result<Vec<f32>, Self::Error>;
}

/// The error produced when expressing or activating
/// a genome of type `G`.
pub type PhenotypeError<G> = <<G as Genome>::Phenotype as Phenotype>::Error;
