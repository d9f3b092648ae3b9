//! Generational records of a population's evolution.
use super::{Client, Population, SpeciesID};
use crate::Genome;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Specifies which genomes are stored
/// on each generation's log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportingLevel {
    /// Every genome of the population, grouped by species.
    AllGenomes,
    /// The best genome of each species.
    SpeciesChampions,
    /// The best genome of the population.
    PopulationChampion,
    /// No genomes are stored.
    NoGenomes,
}

/// Summary figures of a population at a point in time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub generation: usize,
    /// Member count of every living species.
    pub species_sizes: Vec<(SpeciesID, usize)>,
    pub best_fitness: f32,
    pub mean_fitness: f32,
    pub worst_fitness: f32,
    pub compatibility_threshold: f32,
}

impl fmt::Display for PopulationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "generation {}: {} species, fitness best {:.4} / mean {:.4} / worst {:.4}, threshold {:.3}",
            self.generation,
            self.species_sizes.len(),
            self.best_fitness,
            self.mean_fitness,
            self.worst_fitness,
            self.compatibility_threshold,
        )
    }
}

/// A single generation's log.
#[derive(Clone, Debug)]
pub struct Log<G> {
    pub generation_number: usize,
    pub generation_sample: GenerationMemberRecord<G>,
    pub species_count: usize,
    pub population_stats: PopulationStats,
    /// Statistics of each value extracted from the clients.
    pub client_stats: Vec<(String, Stats)>,
}

impl<G> fmt::Display for Log<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Log {{")?;
        writeln!(f, "\tgeneration_number: {:?}", self.generation_number)?;
        writeln!(f, "\tspecies_count: {:?}", self.species_count)?;
        for (name, stats) in &self.client_stats {
            writeln!(f, "\t{}: {:?}", name, stats)?;
        }
        write!(f, "}}")
    }
}

/// Basic statistics of a set of values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub maximum: f32,
    pub minimum: f32,
    pub mean: f32,
    pub median: f32,
}

impl Stats {
    /// Computes the statistics of the passed data.
    /// Empty data yields all-zero statistics.
    ///
    /// # Examples
    /// ```
    /// use evoneat::populations::logging::Stats;
    ///
    /// let stats = Stats::from([1.0, 4.0, 2.0, 3.0].into_iter());
    ///
    /// assert_eq!(stats.maximum, 4.0);
    /// assert_eq!(stats.minimum, 1.0);
    /// assert_eq!(stats.mean, 2.5);
    /// assert_eq!(stats.median, 2.5);
    /// ```
    pub fn from(data: impl Iterator<Item = f32>) -> Stats {
        let mut data: Vec<f32> = data.collect();
        if data.is_empty() {
            return Stats {
                maximum: 0.0,
                minimum: 0.0,
                mean: 0.0,
                median: 0.0,
            };
        }
        data.sort_unstable_by(f32::total_cmp);
        let mid = data.len() / 2;
        let median = if data.len() % 2 == 0 {
            (data[mid - 1] + data[mid]) / 2.0
        } else {
            data[mid]
        };
        Stats {
            maximum: data[data.len() - 1],
            minimum: data[0],
            mean: data.iter().sum::<f32>() / data.len() as f32,
            median,
        }
    }
}

/// The genomes sampled from a generation.
#[derive(Clone, Debug)]
pub enum GenerationMemberRecord<G> {
    /// Species ID, member genomes, and time stagnated.
    Species(Vec<(SpeciesID, Vec<G>, usize)>),
    /// Species ID, champion genome, and time stagnated.
    SpeciesChampions(Vec<(SpeciesID, G, usize)>),
    PopulationChampion(G),
    None,
}

/// Records population statistics and genomes
/// at each generation it is called upon.
///
/// Logging is meant to be done after fitness
/// evaluation and before evolution, so that
/// the scores of the generation are known.
#[derive(Clone, Debug)]
pub struct EvolutionLogger<G> {
    reporting_level: ReportingLevel,
    logs: Vec<Log<G>>,
}

impl<G: Genome> EvolutionLogger<G> {
    /// Creates a new logger storing genomes
    /// at the specified level.
    pub fn new(reporting_level: ReportingLevel) -> EvolutionLogger<G> {
        EvolutionLogger {
            reporting_level,
            logs: vec![],
        }
    }

    /// Records the population's current state, computing
    /// statistics over the `N` values `client_stat_extractor`
    /// returns for each client.
    ///
    /// # Examples
    /// ```
    /// use evoneat::populations::logging::{EvolutionLogger, ReportingLevel};
    /// use evoneat::{Population, PopulationConfig};
    /// use evoneat_nn::genomics::{GeneticConfig, NNGenome};
    /// use std::num::NonZeroUsize;
    ///
    /// let mut population = Population::<NNGenome>::new(
    ///     PopulationConfig {
    ///         size: NonZeroUsize::new(10).unwrap(),
    ///         seed: Some(3),
    ///         ..PopulationConfig::zero()
    ///     },
    ///     GeneticConfig::zero(),
    /// );
    /// population.evaluate_fitness(|_, _| 1.0);
    ///
    /// let mut logger = EvolutionLogger::new(ReportingLevel::PopulationChampion);
    /// logger.log(&population, &|c| [c.fitness()], ["fitness"]);
    ///
    /// let log = logger.iter().next().unwrap();
    /// assert_eq!(log.client_stats[0].1.mean, 1.0);
    /// ```
    pub fn log<CSE, const N: usize>(
        &mut self,
        population: &Population<G>,
        client_stat_extractor: &CSE,
        stat_names: [&str; N],
    ) where
        CSE: Fn(&Client<G>) -> [f32; N],
    {
        let stats: Vec<[f32; N]> = population.clients().iter().map(client_stat_extractor).collect();
        let client_stats = stat_names
            .iter()
            .map(|name| name.to_string())
            .zip(unzip_n_vecs(stats.into_iter()))
            .map(|(name, data)| (name, Stats::from(data.into_iter())))
            .collect();
        let clients = population.clients();
        let generation_sample = match self.reporting_level {
            ReportingLevel::AllGenomes => GenerationMemberRecord::Species(
                population
                    .species()
                    .map(|s| {
                        let genomes = s.members().map(|i| clients[i].genome().clone()).collect();
                        (s.id(), genomes, s.time_stagnated())
                    })
                    .collect(),
            ),
            ReportingLevel::SpeciesChampions => GenerationMemberRecord::SpeciesChampions(
                population
                    .species()
                    .filter_map(|s| {
                        s.champion(clients)
                            .map(|i| (s.id(), clients[i].genome().clone(), s.time_stagnated()))
                    })
                    .collect(),
            ),
            ReportingLevel::PopulationChampion => {
                GenerationMemberRecord::PopulationChampion(population.champion().genome().clone())
            }
            ReportingLevel::NoGenomes => GenerationMemberRecord::None,
        };
        self.logs.push(Log {
            generation_number: population.generation(),
            generation_sample,
            species_count: population.species().count(),
            population_stats: population.stats(),
            client_stats,
        })
    }

    /// Returns an iterator over all logs, from
    /// oldest to most recent.
    pub fn iter(&self) -> impl Iterator<Item = &Log<G>> {
        self.logs.iter()
    }
}

fn unzip_n_vecs<T: Clone, const N: usize>(iter: impl Iterator<Item = [T; N]>) -> Vec<Vec<T>> {
    let mut vecs = vec![Vec::default(); N];
    for items in iter {
        for (i, item) in items.into_iter().enumerate() {
            vecs[i].push(item);
        }
    }
    vecs
}
