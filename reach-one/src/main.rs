use evoneat::populations::logging::{EvolutionLogger, ReportingLevel};
use evoneat::{Phenotype, Population, PopulationConfig};
use evoneat_nn::genomics::{GeneticConfig, NNGenome};
use evoneat_nn::networks::Calculator;

use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

use std::error::Error;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::{env, fs};

/// Input vectors every network is scored on.
const SAMPLES: [[f32; 2]; 4] = [[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];

/// Settings of a run, read from a RON document.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
struct ExperimentConfig {
    genetic: GeneticConfig,
    population: PopulationConfig,
    /// Maximum number of generations to run.
    generations: usize,
    /// Fitness at which the run stops early.
    target_fitness: f32,
    /// Per-generation evaluation deadline. Without
    /// one, clients are evaluated in parallel until done.
    evaluation_timeout_ms: Option<u64>,
    /// Where the champion's snapshot is written.
    snapshot_path: Option<PathBuf>,
    /// Generations between champion snapshots.
    snapshot_interval: usize,
}

impl Default for ExperimentConfig {
    fn default() -> ExperimentConfig {
        ExperimentConfig {
            genetic: GeneticConfig {
                input_count: NonZeroUsize::new(2).unwrap(),
                output_count: NonZeroUsize::new(1).unwrap(),
                ..GeneticConfig::default()
            },
            population: PopulationConfig::default(),
            generations: 100,
            target_fitness: 0.99,
            evaluation_timeout_ms: None,
            snapshot_path: None,
            snapshot_interval: 10,
        }
    }
}

/// Rewards networks whose output approaches 1.0 on every sample.
fn reach_one(_: &NNGenome, network: &mut Calculator) -> f32 {
    let mut fitness = 0.0;
    for inputs in SAMPLES {
        match network.activate(&inputs) {
            Ok(outputs) => fitness += 1.0 - (1.0 - outputs[0]).abs(),
            Err(_) => return 0.0,
        }
    }
    fitness / SAMPLES.len() as f32
}

fn load_config() -> Result<ExperimentConfig, Box<dyn Error>> {
    match env::args().nth(1) {
        Some(path) => {
            let document = fs::read_to_string(&path)?;
            let config = ron::from_str(&document)?;
            info!(%path, "loaded experiment configuration");
            Ok(config)
        }
        None => {
            info!("no configuration given, using defaults");
            Ok(ExperimentConfig::default())
        }
    }
}

fn write_snapshot(genome: &NNGenome, config: &ExperimentConfig) -> Result<(), Box<dyn Error>> {
    if let Some(path) = &config.snapshot_path {
        let document = ron::ser::to_string_pretty(&genome.snapshot(), Default::default())?;
        fs::write(path, document)?;
        info!(path = %path.display(), "wrote champion snapshot");
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;
    let mut population =
        Population::<NNGenome>::new(config.population.clone(), config.genetic.clone());
    let mut logger = EvolutionLogger::new(ReportingLevel::PopulationChampion);
    let evaluator = Arc::new(reach_one);

    for generation in 0..config.generations {
        match config.evaluation_timeout_ms {
            Some(ms) => population
                .evaluate_fitness_with_timeout(Duration::from_millis(ms), Arc::clone(&evaluator)),
            None => population.evaluate_fitness_parallel(reach_one),
        }
        logger.log(
            &population,
            &|c| {
                [
                    c.fitness(),
                    c.genome().nodes().count() as f32,
                    c.genome().enabled_connection_count() as f32,
                ]
            },
            ["fitness", "nodes", "enabled connections"],
        );

        let champion = population.champion();
        if champion.fitness() >= config.target_fitness {
            info!(
                generation = population.generation(),
                fitness = champion.fitness(),
                "target fitness reached"
            );
            break;
        }
        if generation + 1 == config.generations {
            break;
        }
        if config.snapshot_interval > 0 && population.generation() % config.snapshot_interval == 0 {
            write_snapshot(champion.genome(), &config)?;
        }

        let stats = population.evolve()?;
        println!("{}", stats);
    }

    if let Some(log) = logger.iter().last() {
        for (name, stats) in &log.client_stats {
            info!(name = name.as_str(), ?stats, "final generation");
        }
    }
    let champion = population.champion();
    println!("Champion: {}", champion.genome());
    write_snapshot(champion.genome(), &config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_experiment_has_two_inputs_and_one_output() {
        let config = ExperimentConfig::default();
        assert_eq!(config.genetic.input_count.get(), 2);
        assert_eq!(config.genetic.output_count.get(), 1);
    }

    #[test]
    fn sample_configuration_parses() {
        let config: ExperimentConfig = ron::from_str(include_str!("../config.ron")).unwrap();
        assert_eq!(config.population.size.get(), 150);
        assert_eq!(config.population.seed, Some(2002));
        assert_eq!(config.snapshot_path, Some(PathBuf::from("champion.ron")));
    }
}
