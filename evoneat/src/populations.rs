//! A Population is a collection of clients, each
//! owning a genome. These are grouped into species,
//! which can be evolved using a fitness evaluation
//! function as the source of selective pressure.
mod client;
mod config;
mod errors;
pub mod logging;
mod offspring_factory;
mod species;

use crate::rng::{self, EvolutionRng};
use crate::{Genome, InnovationHistory};
pub use client::Client;
pub use config::PopulationConfig;
pub use errors::PopulationError;
use logging::PopulationStats;
use offspring_factory::{Offspring, OffspringFactory};
pub use species::{Species, SpeciesID};

use rand::prelude::IteratorRandom;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// The stage of the generational cycle
/// a population is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No evaluation has been requested yet.
    Created,
    /// Waiting on, or collecting, fitness scores.
    Evaluating,
    /// Updating species fitness and stagnation records.
    Speciating,
    /// Allotting and breeding offspring.
    Reproducing,
    /// Applying mutations to the offspring.
    Mutating,
}

/// A population of clients.
pub struct Population<G: Genome> {
    clients: Vec<Client<G>>,
    species: Vec<Species<G>>,
    history: G::InnovationHistory,
    generation: usize,
    historical_species_count: usize,
    compatibility_threshold: f32,
    best_fitness_seen: Option<f32>,
    phase: Phase,
    rng: EvolutionRng,
    population_config: PopulationConfig,
    genetic_config: G::Config,
}

impl<G: Genome> Population<G> {
    /// Creates a new population using the passed configurations.
    ///
    /// The type of `genetic_config` depends on the implementation
    /// of [`Genome`], and is effectively opaque to the population.
    /// The initial clients are speciated right away.
    ///
    /// [`Genome`]: crate::Genome
    ///
    /// # Examples
    /// ```
    /// # use evoneat_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use evoneat::{Population, PopulationConfig};
    ///
    /// let pop_config = PopulationConfig {
    ///     // Set desired configuration
    ///     ..PopulationConfig::zero()
    /// };
    /// # let genetic_config = GeneticConfig::zero();
    ///
    /// // With `G` a suitable type implementing `Genome`...
    /// let population = Population::<G>::new(pop_config, genetic_config);
    /// ```
    pub fn new(population_config: PopulationConfig, genetic_config: G::Config) -> Population<G> {
        let mut rng = rng::seeded(population_config.seed);
        let clients = (0..population_config.size.get())
            .map(|_| Client::new(G::new(&genetic_config, &mut rng)))
            .collect();
        let mut population = Population {
            clients,
            species: vec![],
            history: G::InnovationHistory::new(&genetic_config),
            generation: 0,
            historical_species_count: 0,
            compatibility_threshold: population_config.compatibility_threshold,
            best_fitness_seen: None,
            phase: Phase::Created,
            rng,
            population_config,
            genetic_config,
        };
        population.speciate();
        info!(
            size = population.clients.len(),
            species = population.species.len(),
            "created population"
        );
        population
    }

    /// Creates a new population using the passed configurations,
    /// and seeds it with the specified genomes. If the number of
    /// seed genomes is not as large as the configured population
    /// size, the remaining space is filled with random genomes.
    ///
    /// Returns `None` if either the configured population size is
    /// lesser than the number of seed genomes, or any of the genomes
    /// are incompatible with the specified genetic config, as established
    /// by [`Genome::conforms_to`].
    ///
    /// [`Genome::conforms_to`]: crate::Genome::conforms_to
    ///
    /// # Examples
    /// ```
    /// # use evoneat_nn::genomics::{GeneticConfig, NNGenome};
    /// use evoneat::{Population, PopulationConfig};
    ///
    /// let pop_config = PopulationConfig {
    ///     size: std::num::NonZeroUsize::new(100).unwrap(),
    ///     ..PopulationConfig::zero()
    /// };
    /// # let genetic_config = GeneticConfig {
    /// #     weight_bound: 1.0,
    /// #     ..GeneticConfig::zero()
    /// # };
    /// # let mut rng = evoneat::rng::seeded(Some(1));
    /// # let g1 = NNGenome::new(&genetic_config, &mut rng);
    /// # let g2 = NNGenome::new(&genetic_config, &mut rng);
    ///
    /// // With `seed` a vector of a suitable type implementing `Genome`...
    /// let population = Population::new_seeded(vec![g1, g2], pop_config, genetic_config).unwrap();
    ///
    /// # assert_eq!(population.clients().len(), 100);
    /// ```
    pub fn new_seeded(
        genomes: Vec<G>,
        population_config: PopulationConfig,
        genetic_config: G::Config,
    ) -> Option<Population<G>> {
        if population_config.size.get() < genomes.len()
            || !genomes.iter().all(|g| g.conforms_to(&genetic_config))
        {
            return None;
        }

        let mut population = Population::new(population_config, genetic_config);
        for (client, genome) in population.clients.iter_mut().zip(genomes) {
            genome.advance_history(&mut population.history);
            *client = Client::new(genome);
        }
        population.species.clear();
        population.historical_species_count = 0;
        population.speciate();
        Some(population)
    }

    /// Evaluates the fitness of each client in the
    /// population using the passed evaluator, which
    /// receives the client's genome and phenotype.
    ///
    /// Evaluations that panic, or return negative or
    /// non-finite values, are scored with the
    /// [minimum fitness]. So are genomes which cannot
    /// be expressed.
    ///
    /// [minimum fitness]: PopulationConfig::minimum_fitness
    ///
    /// # Examples
    /// ```
    /// # use evoneat_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use evoneat::{Phenotype, Population, PopulationConfig};
    ///
    /// # let genetic_config = GeneticConfig::zero();
    /// let mut population = Population::<G>::new(PopulationConfig::zero(), genetic_config);
    ///
    /// population.evaluate_fitness(|_genome, network| {
    ///     // Networks with outputs closer to 0 are given higher scores.
    ///     let output = network.activate(&[1.0]).unwrap()[0];
    ///     1.0 - output.abs()
    /// });
    /// # assert!(population.clients().iter().all(|c| c.score().is_some()));
    /// ```
    pub fn evaluate_fitness<E>(&mut self, mut evaluator: E)
    where
        E: FnMut(&G, &mut G::Phenotype) -> f32,
    {
        self.enter(Phase::Evaluating);
        let minimum = self.population_config.minimum_fitness;
        for client in &mut self.clients {
            let score = evaluate_client(client, &self.genetic_config, minimum, &mut evaluator);
            client.set_score(score);
        }
    }

    /// Evaluates the fitness of each client in parallel,
    /// on rayon's global thread pool.
    ///
    /// Behaves as [`evaluate_fitness`] otherwise.
    ///
    /// [`evaluate_fitness`]: Population::evaluate_fitness
    pub fn evaluate_fitness_parallel<E>(&mut self, evaluator: E)
    where
        E: Fn(&G, &mut G::Phenotype) -> f32 + Sync,
        G: Send,
        G::Phenotype: Send,
        G::Config: Sync,
    {
        self.enter(Phase::Evaluating);
        let minimum = self.population_config.minimum_fitness;
        let genetic_config = &self.genetic_config;
        self.clients.par_iter_mut().for_each(|client| {
            let score = evaluate_client(client, genetic_config, minimum, &evaluator);
            client.set_score(score);
        });
    }

    /// Evaluates the fitness of each client concurrently,
    /// waiting at most `timeout` for all scores to arrive.
    ///
    /// Clients whose score has not been reported by the
    /// deadline are given the [minimum fitness]; their
    /// evaluations are left to finish in the background
    /// and their results are discarded.
    ///
    /// Each call runs on its own thread pool, so evaluations
    /// abandoned by an earlier call never delay later ones.
    ///
    /// [minimum fitness]: PopulationConfig::minimum_fitness
    pub fn evaluate_fitness_with_timeout<E>(&mut self, timeout: Duration, evaluator: Arc<E>)
    where
        E: Fn(&G, &mut G::Phenotype) -> f32 + Send + Sync + 'static,
        G: Send + 'static,
        G::Phenotype: Clone + Send + 'static,
    {
        self.enter(Phase::Evaluating);
        let minimum = self.population_config.minimum_fitness;
        let deadline = Instant::now() + timeout;
        let (sender, receiver) = mpsc::channel();
        let mut awaiting = vec![false; self.clients.len()];
        let pool = match ThreadPoolBuilder::new()
            .num_threads(rayon::current_num_threads())
            .thread_name(|i| format!("evoneat-evaluation-{}", i))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(error) => {
                warn!(%error, "could not build an evaluation pool, using one thread per client");
                None
            }
        };

        for (index, client) in self.clients.iter_mut().enumerate() {
            let mut phenotype = match client.phenotype(&self.genetic_config) {
                Ok(phenotype) => phenotype.clone(),
                Err(e) => {
                    report_expression_failure(&e);
                    client.set_score(minimum);
                    continue;
                }
            };
            let genome = client.genome().clone();
            let evaluator = Arc::clone(&evaluator);
            let sender = sender.clone();
            let job = move || {
                let score = guarded_evaluation(|| evaluator(&genome, &mut phenotype));
                // The receiver is gone once the deadline has passed.
                let _ = sender.send((index, score));
            };
            match &pool {
                Some(pool) => pool.spawn(job),
                None => drop(thread::spawn(job)),
            }
            awaiting[index] = true;
        }
        drop(sender);

        let mut pending = awaiting.iter().filter(|&&a| a).count();
        while pending > 0 {
            match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok((index, score)) => {
                    self.clients[index].set_score(sanitize_score(score, minimum));
                    awaiting[index] = false;
                    pending -= 1;
                }
                Err(_) => break,
            }
        }

        if pending > 0 {
            warn!(
                pending,
                ?timeout,
                "clients failed to report a score in time, assigning minimum fitness"
            );
            for (client, _) in self.clients.iter_mut().zip(awaiting).filter(|(_, a)| *a) {
                client.set_score(minimum);
            }
        }
    }

    /// Evolves the population by one generation.
    ///
    /// Species fitness and stagnation records are updated,
    /// each species is allotted offspring in proportion to
    /// its adjusted fitness, offspring are bred from the best
    /// performing members and mutated, and the new generation
    /// is speciated against freshly chosen representatives.
    ///
    /// Returns the statistics of the generation just evaluated.
    ///
    /// # Errors
    /// Returns an error if any client has not been
    /// assigned a score. The population is left untouched.
    ///
    /// # Examples
    /// ```
    /// # use evoneat_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use evoneat::{Population, PopulationConfig};
    ///
    /// # let genetic_config = GeneticConfig::zero();
    /// let mut population = Population::<G>::new(
    ///     PopulationConfig {
    ///         survival_threshold: 1.0,
    ///         ..PopulationConfig::zero()
    ///     },
    ///     genetic_config,
    /// );
    ///
    /// // Evolution before evaluation is an error.
    /// assert!(population.evolve().is_err());
    ///
    /// population.evaluate_fitness(|_, _| 1.0);
    /// let stats = population.evolve().unwrap();
    ///
    /// assert_eq!(stats.generation, 0);
    /// assert_eq!(population.generation(), 1);
    /// ```
    pub fn evolve(&mut self) -> Result<PopulationStats, PopulationError> {
        let missing = self.clients.iter().filter(|c| c.score().is_none()).count();
        if missing > 0 {
            return Err(PopulationError::EvaluationIncomplete { missing });
        }
        let minimum = self.population_config.minimum_fitness;
        for client in &mut self.clients {
            let score = sanitize_score(client.fitness(), minimum);
            client.set_score(score);
        }

        self.enter(Phase::Speciating);
        self.update_species_fitness();
        let stats = self.stats();
        self.best_fitness_seen = Some(
            self.best_fitness_seen
                .map_or(stats.best_fitness, |best| best.max(stats.best_fitness)),
        );
        info!(
            generation = stats.generation,
            species = stats.species_sizes.len(),
            best = stats.best_fitness,
            mean = stats.mean_fitness,
            worst = stats.worst_fitness,
            threshold = stats.compatibility_threshold,
            "generation evaluated"
        );

        self.adjust_compatibility_threshold();

        self.enter(Phase::Reproducing);
        let champion = self.champion_index();
        let champion_species = self.species_of(champion);
        let allotted_offspring = self.allot_offspring(champion_species);
        let offspring = OffspringFactory::new(
            &self.species,
            &self.clients,
            &self.genetic_config,
            &self.population_config,
            Some(champion),
            &mut self.rng,
        )
        .generate_offspring(&allotted_offspring);
        self.retire_species(&allotted_offspring);

        self.enter(Phase::Mutating);
        self.history.reset_generation_cache();
        let mut next_generation = Vec::with_capacity(offspring.len());
        for Offspring { genome, elite } in offspring {
            let mut client = Client::new(genome);
            if !elite {
                client.mutate(&mut self.history, &self.genetic_config, &mut self.rng);
            }
            next_generation.push(client);
        }

        self.clients = next_generation;
        self.generation += 1;
        self.speciate();
        self.enter(Phase::Evaluating);
        Ok(stats)
    }

    /// Assigns every client to the first species whose
    /// representative is within the compatibility threshold,
    /// founding new species for clients matching none.
    /// Species left without members are removed.
    fn speciate(&mut self) {
        for species in &mut self.species {
            species.clear_members();
        }

        let mut new_species_count = 0;
        for index in 0..self.clients.len() {
            let genome = self.clients[index].genome();
            let compatible = self.species.iter().position(|s| {
                s.genetic_distance(genome, &self.genetic_config) < self.compatibility_threshold
            });
            let species_index = match compatible {
                Some(species_index) => species_index,
                None => {
                    let id = SpeciesID(self.generation, new_species_count);
                    new_species_count += 1;
                    debug!(?id, "new species founded");
                    self.species.push(Species::new(id, genome.clone()));
                    self.species.len() - 1
                }
            };
            self.species[species_index].add_member(index);
            let id = self.species[species_index].id();
            self.clients[index].set_species(id);
        }
        self.historical_species_count += new_species_count;
        self.remove_extinct_species();
    }

    /// Removes all memberless species from the population.
    fn remove_extinct_species(&mut self) {
        self.species.retain(|s| {
            if s.is_empty() {
                debug!(id = ?s.id(), "species went extinct");
            }
            !s.is_empty()
        });
    }

    /// Updates each species' stagnation record and
    /// shares fitness among its members.
    fn update_species_fitness(&mut self) {
        for species in &mut self.species {
            species.update_stagnation(&self.clients);
            species.share_fitness(&mut self.clients);
        }
    }

    /// Nudges the compatibility threshold towards
    /// producing the target number of species.
    fn adjust_compatibility_threshold(&mut self) {
        let target = self.population_config.target_species;
        if target == 0 {
            return;
        }
        let step = self.population_config.threshold_step;
        let species_count = self.species.len();
        if species_count < target {
            self.compatibility_threshold = (self.compatibility_threshold - step)
                .max(self.population_config.minimum_threshold);
        } else if species_count > target {
            self.compatibility_threshold += step;
        }
        debug!(
            species_count,
            target,
            threshold = self.compatibility_threshold,
            "adjusted compatibility threshold"
        );
    }

    /// Allot the number of offspring for each species,
    /// based on proportional adjusted species fitness
    /// and stagnation status.
    ///
    /// Stagnant species receive no offspring. A stagnant
    /// species holding the population champion keeps a
    /// single slot for its elite. If every species is
    /// stagnant, the champion's species (or, lacking one,
    /// every species) breeds as usual.
    fn allot_offspring(&self, champion_species: Option<usize>) -> Vec<usize> {
        let size = self.population_config.size.get();
        let mut eligible: Vec<bool> = self
            .species
            .iter()
            .map(|s| !s.is_stagnant(&self.population_config))
            .collect();

        let mut elite_slot = None;
        if !eligible.iter().any(|&e| e) {
            warn!("every species has stagnated, relaxing stagnation control");
            match champion_species {
                Some(champion_species) => eligible[champion_species] = true,
                None => eligible.iter_mut().for_each(|e| *e = true),
            }
        } else if let Some(champion_species) = champion_species {
            if !eligible[champion_species] {
                elite_slot = Some(champion_species);
            }
        }
        for (species, &breeds) in self.species.iter().zip(&eligible) {
            if !breeds {
                debug!(id = ?species.id(), generations = species.time_stagnated(), "species stagnated");
            }
        }

        let mut weights: Vec<f32> = self
            .species
            .iter()
            .zip(&eligible)
            .map(|(s, &e)| if e { s.adjusted_fitness() } else { 0.0 })
            .collect();
        let mut total: f32 = weights.iter().sum();
        if !(total > 0.0) {
            warn!("eligible species have no fitness, allotting offspring by species size");
            weights = self
                .species
                .iter()
                .zip(&eligible)
                .map(|(s, &e)| if e { s.len() as f32 } else { 0.0 })
                .collect();
            total = weights.iter().sum();
        }

        let bred = size - usize::from(elite_slot.is_some());
        let shares: Vec<f32> = weights.iter().map(|w| w / total * bred as f32).collect();
        let mut allotted = round_retain_sum(&shares, bred);

        if let Some(elite_slot) = elite_slot {
            allotted[elite_slot] += 1;
        } else if let Some(champion_species) = champion_species {
            if allotted[champion_species] == 0 {
                if let Some(donor) = (0..allotted.len()).max_by_key(|&i| allotted[i]) {
                    allotted[donor] -= 1;
                    allotted[champion_species] += 1;
                }
            }
        }
        allotted
    }

    /// Drops species that received no offspring, and replaces
    /// the representative of the rest with a random member
    /// of the outgoing generation.
    fn retire_species(&mut self, allotted_offspring: &[usize]) {
        let mut survivors = Vec::with_capacity(self.species.len());
        for (mut species, &allotted) in self.species.drain(..).zip(allotted_offspring) {
            if allotted == 0 {
                debug!(id = ?species.id(), "species left no offspring");
                continue;
            }
            if let Some(member) = species.members().choose(&mut self.rng) {
                species.set_representative(self.clients[member].genome().clone());
            }
            species.clear_members();
            survivors.push(species);
        }
        self.species = survivors;
    }

    fn enter(&mut self, phase: Phase) {
        if self.phase != phase {
            trace!(from = ?self.phase, to = ?phase, generation = self.generation, "phase transition");
            self.phase = phase;
        }
    }

    fn champion_index(&self) -> usize {
        (0..self.clients.len())
            .max_by(|&a, &b| self.clients[a].fitness().total_cmp(&self.clients[b].fitness()))
            .unwrap_or(0)
    }

    fn species_of(&self, client: usize) -> Option<usize> {
        self.species.iter().position(|s| s.members().any(|m| m == client))
    }

    /// Resets the population to an initial randomized state.
    /// Used primarily in case of population degeneration.
    ///
    /// With a configured seed, the population is reset
    /// to the exact state it was created in.
    pub fn reset(&mut self)
    where
        G::Config: Clone,
    {
        *self = Population::new(self.population_config.clone(), self.genetic_config.clone());
    }

    /// Returns the currently best-performing client.
    ///
    /// # Examples
    /// ```
    /// # use evoneat_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use evoneat::{Population, PopulationConfig};
    ///
    /// # let genetic_config = GeneticConfig::zero();
    /// let mut population = Population::<G>::new(
    ///     PopulationConfig {
    ///         size: std::num::NonZeroUsize::new(20).unwrap(),
    ///         ..PopulationConfig::zero()
    ///     },
    ///     genetic_config,
    /// );
    ///
    /// let mut fitness = 0.0;
    /// population.evaluate_fitness(move |_, _| {
    ///     fitness += 10.0;
    ///     fitness
    /// });
    ///
    /// assert_eq!(population.champion().fitness(), 20.0 * 10.0);
    /// ```
    pub fn champion(&self) -> &Client<G> {
        &self.clients[self.champion_index()]
    }

    /// Returns a snapshot of the population's statistics.
    /// Fitness figures only take evaluated clients
    /// into account.
    pub fn stats(&self) -> PopulationStats {
        let scores: Vec<f32> = self.clients.iter().filter_map(Client::score).collect();
        let (best, worst, sum) = scores.iter().fold(
            (f32::MIN, f32::MAX, 0.0),
            |(best, worst, sum), &s| (best.max(s), worst.min(s), sum + s),
        );
        let (best, worst, mean) = if scores.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            (best, worst, sum / scores.len() as f32)
        };
        PopulationStats {
            generation: self.generation,
            species_sizes: self.species.iter().map(|s| (s.id(), s.len())).collect(),
            best_fitness: best,
            mean_fitness: mean,
            worst_fitness: worst,
            compatibility_threshold: self.compatibility_threshold,
        }
    }

    /// Returns the current clients.
    pub fn clients(&self) -> &[Client<G>] {
        &self.clients
    }

    /// Returns the current clients mutably, e.g. for
    /// an external harness to record their scores.
    pub fn clients_mut(&mut self) -> &mut [Client<G>] {
        self.enter(Phase::Evaluating);
        &mut self.clients
    }

    /// Returns an iterator over all current species.
    ///
    /// # Examples
    /// ```
    /// # use evoneat_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use evoneat::{Population, PopulationConfig};
    ///
    /// # let genetic_config = GeneticConfig::zero();
    /// // With `G` a suitable type implementing `Genome`...
    /// let population = Population::<G>::new(PopulationConfig::zero(), genetic_config);
    ///
    /// for species in population.species() {
    ///     println!("Species {:?} has {} members", species.id(), species.len());
    /// }
    /// ```
    pub fn species(&self) -> impl Iterator<Item = &Species<G>> {
        self.species.iter()
    }

    /// Returns the current generation number.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Returns the number of species founded
    /// over the population's lifetime.
    pub fn historical_species_count(&self) -> usize {
        self.historical_species_count
    }

    /// Returns the current compatibility threshold.
    pub fn compatibility_threshold(&self) -> f32 {
        self.compatibility_threshold
    }

    /// Returns the best raw fitness recorded by
    /// any completed generation.
    pub fn best_fitness_seen(&self) -> Option<f32> {
        self.best_fitness_seen
    }

    /// Returns the stage of the generational
    /// cycle the population is in.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the population's innovation history.
    pub fn history(&self) -> &G::InnovationHistory {
        &self.history
    }

    pub fn genetic_config(&self) -> &G::Config {
        &self.genetic_config
    }

    pub fn population_config(&self) -> &PopulationConfig {
        &self.population_config
    }
}

/// Scores a single client, building its phenotype
/// if needed and shielding the caller from failures.
fn evaluate_client<G, E>(client: &mut Client<G>, config: &G::Config, minimum: f32, evaluator: E) -> f32
where
    G: Genome,
    E: FnOnce(&G, &mut G::Phenotype) -> f32,
{
    let mut phenotype = match client.take_phenotype() {
        Some(phenotype) => phenotype,
        None => match client.genome().express(config) {
            Ok(phenotype) => phenotype,
            Err(e) => {
                report_expression_failure(&e);
                return minimum;
            }
        },
    };
    let score = guarded_evaluation(|| evaluator(client.genome(), &mut phenotype));
    client.restore_phenotype(phenotype);
    sanitize_score(score, minimum)
}

/// Runs an evaluation, turning panics into NaN scores.
fn guarded_evaluation<F: FnOnce() -> f32>(evaluation: F) -> f32 {
    panic::catch_unwind(AssertUnwindSafe(evaluation)).unwrap_or_else(|_| {
        warn!("fitness evaluation panicked");
        f32::NAN
    })
}

fn report_expression_failure<E: Display>(error: &E) {
    warn!(%error, "genome could not be expressed, assigning minimum fitness");
}

/// Replaces negative or non-finite scores with `minimum`.
fn sanitize_score(score: f32, minimum: f32) -> f32 {
    if score.is_finite() && score >= 0.0 {
        score
    } else {
        warn!(score, "invalid fitness score, assigning minimum fitness");
        minimum
    }
}

/// Rounds all values to whole numbers summing to `total`,
/// assuming the values' sum is close to it. Rounding is
/// done in the manner that minimizes the average error
/// to the original set of values.
fn round_retain_sum(values: &[f32], total: usize) -> Vec<usize> {
    let mut truncated: Vec<(usize, usize, f32)> = values
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let u = f.max(0.0).floor();
            (i, u as usize, f - u)
        })
        .collect();
    let truncated_sum: usize = truncated.iter().map(|(_, u, _)| *u).sum();
    let remainder = total.saturating_sub(truncated_sum).min(truncated.len());
    // Sort in decreasing order of error
    truncated.sort_by(|a, b| b.2.total_cmp(&a.2));
    for (_, u, _) in &mut truncated[..remainder] {
        *u += 1;
    }
    truncated.sort_by_key(|(i, ..)| *i);
    truncated.iter().map(|(_, u, _)| *u).collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Gain, Scalar};
    use crate::Phenotype;
    use std::num::NonZeroUsize;

    fn config(size: usize, threshold: f32) -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::new(size).unwrap(),
            seed: Some(42),
            compatibility_threshold: threshold,
            elitism: 1,
            elitism_min_species_size: 1,
            survival_threshold: 0.5,
            sexual_reproduction_chance: 0.5,
            stagnation_limit: NonZeroUsize::new(15).unwrap(),
            ..PopulationConfig::zero()
        }
    }

    fn with_values(values: &[f32], threshold: f32) -> Population<Scalar> {
        let genomes = values.iter().copied().map(Scalar::with_value).collect();
        Population::new_seeded(genomes, config(values.len(), threshold), ()).unwrap()
    }

    fn assert_partitioned(population: &Population<Scalar>) {
        let mut seen = vec![0; population.clients().len()];
        for species in population.species() {
            assert!(!species.is_empty());
            for member in species.members() {
                seen[member] += 1;
                assert_eq!(population.clients()[member].species(), Some(species.id()));
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn round_retain_sum() {
        let v = [
            5.2,
            9.5,
            2.8,
            1.3,
            2.2,
            2.7,
            6.3,
            1.0000000000001,
            0.9999999999999,
        ];
        let w = super::round_retain_sum(&v, 32);
        assert_eq!(w.iter().sum::<usize>(), 32);
        assert_eq!(w, [5, 10, 3, 1, 2, 3, 6, 1, 1]);
    }

    #[test]
    fn round_retain_sum_hits_requested_total() {
        let w = super::round_retain_sum(&[3.333, 3.333, 3.333], 10);
        assert_eq!(w.iter().sum::<usize>(), 10);
    }

    #[test]
    fn clients_are_partitioned_into_species() {
        let mut population = Population::<Scalar>::new(config(30, 1.0), ());
        assert_partitioned(&population);

        for _ in 0..5 {
            population.evaluate_fitness(|genome, _| genome.value);
            population.evolve().unwrap();
            assert_partitioned(&population);
        }
    }

    #[test]
    fn species_are_founded_by_distance() {
        let population = with_values(&[0.0, 0.5, 10.0, 10.5, 20.0], 1.0);
        let sizes: Vec<usize> = population.species().map(Species::len).collect();
        assert_eq!(sizes, [2, 2, 1]);
        assert_eq!(population.historical_species_count(), 3);
    }

    #[test]
    fn evolution_requires_every_score() {
        let mut population = Population::<Scalar>::new(config(8, 1.0), ());
        assert_eq!(
            population.evolve(),
            Err(PopulationError::EvaluationIncomplete { missing: 8 })
        );

        population.clients_mut()[3].set_score(1.0);
        assert_eq!(
            population.evolve(),
            Err(PopulationError::EvaluationIncomplete { missing: 7 })
        );
        assert_eq!(population.generation(), 0);
    }

    #[test]
    fn population_size_is_preserved() {
        let mut population = Population::<Scalar>::new(config(25, 0.5), ());
        for _ in 0..10 {
            population.evaluate_fitness(|genome, _| genome.value.max(0.0));
            population.evolve().unwrap();
            assert_eq!(population.clients().len(), 25);
        }
        assert_eq!(population.generation(), 10);
    }

    #[test]
    fn best_fitness_never_decreases() {
        let mut population = Population::<Scalar>::new(config(20, 2.0), ());
        let mut best = f32::MIN;
        for _ in 0..15 {
            population.evaluate_fitness(|genome, _| genome.value.max(0.0));
            let stats = population.evolve().unwrap();
            assert!(stats.best_fitness >= best);
            best = stats.best_fitness;
        }
        assert_eq!(population.best_fitness_seen(), Some(best));
    }

    #[test]
    fn equal_seeds_evolve_identically() {
        let run = || {
            let mut population = Population::<Scalar>::new(config(20, 1.0), ());
            for _ in 0..5 {
                population.evaluate_fitness(|genome, _| genome.value.max(0.0));
                population.evolve().unwrap();
            }
            population
                .clients()
                .iter()
                .map(|c| c.genome().value)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn invalid_scores_become_minimum_fitness() {
        let mut population = with_values(&[1.0, 2.0, 3.0, 4.0], 100.0);
        population.population_config.minimum_fitness = 0.25;
        population.evaluate_fitness(|genome, _| match genome.value as usize {
            1 => f32::NAN,
            2 => -3.0,
            3 => f32::INFINITY,
            _ => 4.0,
        });
        let scores: Vec<_> = population.clients().iter().map(|c| c.fitness()).collect();
        assert_eq!(scores, [0.25, 0.25, 0.25, 4.0]);
    }

    #[test]
    fn panicking_evaluations_become_minimum_fitness() {
        let mut population = with_values(&[1.0, 2.0], 100.0);
        population.evaluate_fitness(|genome, _| {
            if genome.value > 1.5 {
                panic!("evaluation failed");
            }
            1.0
        });
        let scores: Vec<_> = population.clients().iter().map(|c| c.fitness()).collect();
        assert_eq!(scores, [1.0, 0.0]);
    }

    #[test]
    fn parallel_evaluation_scores_every_client() {
        let mut population = Population::<Scalar>::new(config(40, 1.0), ());
        population.evaluate_fitness_parallel(|genome, phenotype| {
            phenotype.activate(&[1.0]).unwrap()[0] - genome.value + 1.0
        });
        assert!(population.clients().iter().all(|c| c.score() == Some(1.0)));
        assert_eq!(population.phase(), Phase::Evaluating);
    }

    #[test]
    fn timed_evaluation_collects_prompt_scores() {
        let mut population = Population::<Scalar>::new(config(10, 1.0), ());
        population.evaluate_fitness_with_timeout(
            Duration::from_secs(10),
            Arc::new(|_: &Scalar, _: &mut Gain| -> f32 { 2.0 }),
        );
        assert!(population.clients().iter().all(|c| c.score() == Some(2.0)));
    }

    #[test]
    fn timed_evaluation_gives_up_on_slow_clients() {
        let mut population = Population::<Scalar>::new(config(3, 1.0), ());
        population.population_config.minimum_fitness = 0.5;
        population.evaluate_fitness_with_timeout(
            Duration::from_millis(20),
            Arc::new(|_: &Scalar, _: &mut Gain| -> f32 {
                std::thread::sleep(Duration::from_millis(500));
                2.0
            }),
        );
        assert!(population.clients().iter().all(|c| c.score() == Some(0.5)));
    }

    #[test]
    fn abandoned_evaluations_do_not_delay_later_generations() {
        let size = rayon::current_num_threads() + 2;
        let mut population = Population::<Scalar>::new(config(size, 1.0), ());
        population.population_config.minimum_fitness = 0.5;
        population.evaluate_fitness_with_timeout(
            Duration::from_millis(20),
            Arc::new(|_: &Scalar, _: &mut Gain| -> f32 {
                std::thread::sleep(Duration::from_secs(3));
                2.0
            }),
        );
        assert!(population.clients().iter().all(|c| c.score() == Some(0.5)));

        population.evaluate_fitness_with_timeout(
            Duration::from_millis(1000),
            Arc::new(|_: &Scalar, _: &mut Gain| -> f32 { 7.0 }),
        );
        assert!(population.clients().iter().all(|c| c.score() == Some(7.0)));

        population.evaluate_fitness_parallel(|_, _| 3.0);
        assert!(population.clients().iter().all(|c| c.score() == Some(3.0)));
    }

    #[test]
    fn stagnant_species_receive_no_offspring() {
        let mut population = with_values(&[0.0, 0.1, 0.2, 50.0, 50.1, 50.2], 1.0);
        population.population_config.stagnation_limit = NonZeroUsize::new(2).unwrap();
        population.evaluate_fitness(|genome, _| if genome.value < 1.0 { 1.0 } else { 2.0 });
        population.update_species_fitness();
        for _ in 0..2 {
            population.species[0].update_stagnation(&population.clients);
        }
        assert!(population.species[0].is_stagnant(&population.population_config));

        let champion_species = population.species_of(population.champion_index());
        assert_eq!(champion_species, Some(1));
        assert_eq!(population.allot_offspring(champion_species), [0, 6]);
    }

    #[test]
    fn stagnant_champion_species_keeps_only_its_elite() {
        let mut population = with_values(&[0.0, 0.1, 0.2, 50.0, 50.1, 50.2], 1.0);
        population.population_config.stagnation_limit = NonZeroUsize::new(2).unwrap();
        population.evaluate_fitness(|genome, _| {
            if genome.value < 1.0 {
                1.0
            } else {
                genome.value - 48.0
            }
        });
        population.update_species_fitness();
        for _ in 0..2 {
            population.species[1].update_stagnation(&population.clients);
        }
        assert!(!population.species[0].is_stagnant(&population.population_config));
        assert!(population.species[1].is_stagnant(&population.population_config));

        let champion_species = population.species_of(population.champion_index());
        assert_eq!(champion_species, Some(1));
        assert_eq!(population.allot_offspring(champion_species), [5, 1]);

        let champion = population.champion().genome().value;
        population.evolve().unwrap();
        let survivors = population
            .clients()
            .iter()
            .filter(|c| c.genome().value > 25.0)
            .count();
        assert_eq!(survivors, 1);
        assert!(population.clients().iter().any(|c| c.genome().value == champion));
    }

    #[test]
    fn every_species_stagnant_breeds_from_champion_species() {
        let mut population = with_values(&[0.0, 0.1, 0.2, 50.0, 50.1, 50.2], 1.0);
        population.population_config.stagnation_limit = NonZeroUsize::new(1).unwrap();
        population.evaluate_fitness(|genome, _| if genome.value < 1.0 { 1.0 } else { 2.0 });
        population.update_species_fitness();
        for species in &mut population.species {
            species.update_stagnation(&population.clients);
        }

        let allotted = population.allot_offspring(Some(1));
        assert_eq!(allotted, [0, 6]);
    }

    #[test]
    fn fitnessless_species_are_allotted_by_size() {
        let mut population = with_values(&[0.0, 0.1, 0.2, 50.0], 1.0);
        population.evaluate_fitness(|_, _| 0.0);
        population.update_species_fitness();
        let allotted = population.allot_offspring(Some(0));
        assert_eq!(allotted, [3, 1]);
    }

    #[test]
    fn fitnessless_generations_still_breed() {
        let mut population = Population::<Scalar>::new(config(12, 1.0), ());
        for _ in 0..3 {
            population.evaluate_fitness(|_, _| 0.0);
            population.evolve().unwrap();
            assert_eq!(population.clients().len(), 12);
        }
    }

    #[test]
    fn fitness_is_shared_within_species() {
        let mut population = with_values(&[0.0, 0.1, 0.2, 50.0, 50.1], 1.0);
        population.evaluate_fitness(|genome, _| genome.value + 1.0);
        population.update_species_fitness();

        for species in &population.species {
            let size = species.len() as f32;
            let mut total = 0.0;
            for member in species.members() {
                let client = &population.clients[member];
                assert!((client.adjusted_fitness() - client.fitness() / size).abs() < 1e-6);
                total += client.adjusted_fitness();
            }
            assert!((species.adjusted_fitness() - total).abs() < 1e-5);
        }
        let sizes: Vec<usize> = population.species().map(Species::len).collect();
        assert_eq!(sizes, [3, 2]);
    }

    #[test]
    fn elites_are_copied_unmutated() {
        let mut population = with_values(&[1.0, 2.0, 3.0, 7.25, 8.0], 100.0);
        population.evaluate_fitness(|genome, _| genome.value);
        let champion = population.champion().genome().value;
        assert_eq!(champion, 8.0);

        population.evolve().unwrap();
        assert_eq!(population.species().count(), 1);
        // Elites lead their species' offspring.
        assert_eq!(population.clients()[0].genome().value, champion);
    }

    #[test]
    fn representatives_change_only_between_generations() {
        let mut population = with_values(&[0.0, 0.9, 1.8], 1.0);
        // 1.8 is within the threshold of 0.9, but not of
        // the representative that 0.9 was compared with.
        let sizes: Vec<usize> = population.species().map(Species::len).collect();
        assert_eq!(sizes, [2, 1]);
        let representatives: Vec<f32> =
            population.species().map(|s| s.representative().value).collect();
        assert_eq!(representatives, [0.0, 1.8]);

        population.evaluate_fitness(|_, _| 1.0);
        let outgoing: Vec<f32> = population.clients().iter().map(|c| c.genome().value).collect();
        population.evolve().unwrap();
        for species in population.species() {
            if species.id().0 < population.generation() {
                assert!(outgoing.contains(&species.representative().value));
            }
        }
    }

    #[test]
    fn threshold_moves_towards_target_species() {
        let mut population = with_values(&[0.0, 10.0, 20.0, 30.0], 1.0);
        population.population_config.target_species = 2;
        population.population_config.threshold_step = 0.5;
        population.adjust_compatibility_threshold();
        assert_eq!(population.compatibility_threshold(), 1.5);

        population.population_config.target_species = 8;
        population.population_config.minimum_threshold = 1.2;
        population.adjust_compatibility_threshold();
        population.adjust_compatibility_threshold();
        assert_eq!(population.compatibility_threshold(), 1.2);
    }

    #[test]
    fn tracker_cache_resets_once_per_generation() {
        let mut population = Population::<Scalar>::new(config(10, 1.0), ());
        for _ in 0..3 {
            population.evaluate_fitness(|genome, _| genome.value.max(0.0));
            population.evolve().unwrap();
        }
        assert_eq!(population.history().resets, 3);
    }

    #[test]
    fn seeding_rejects_oversized_or_nonconforming_seeds() {
        let seeds = vec![Scalar::with_value(1.0), Scalar::with_value(2.0)];
        assert!(Population::new_seeded(seeds, config(1, 1.0), ()).is_none());

        let seeds = vec![Scalar::with_value(f32::NAN)];
        assert!(Population::new_seeded(seeds, config(4, 1.0), ()).is_none());
    }
}
