use evoneat::populations::logging::{EvolutionLogger, GenerationMemberRecord, ReportingLevel};
use evoneat::{Phase, Phenotype, Population, PopulationConfig};
use evoneat_nn::genomics::{GeneticConfig, GenomeSnapshot, NNGenome};
use evoneat_nn::networks::{ActivationType, Calculator};

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

const SAMPLES: [[f32; 2]; 3] = [[0.0, 0.0], [1.0, -1.0], [0.5, 0.25]];

/// Rewards outputs approaching 1.0.
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

fn genetic_config() -> GeneticConfig {
    GeneticConfig {
        input_count: NonZeroUsize::new(2).unwrap(),
        output_count: NonZeroUsize::new(1).unwrap(),
        activation: ActivationType::Sigmoid,
        ..GeneticConfig::default()
    }
}

fn population_config(seed: u64) -> PopulationConfig {
    PopulationConfig {
        size: NonZeroUsize::new(50).unwrap(),
        seed: Some(seed),
        ..PopulationConfig::default()
    }
}

#[test]
fn best_fitness_never_decreases() {
    let mut population = Population::<NNGenome>::new(population_config(7), genetic_config());
    let mut best = f32::MIN;
    for generation in 0..10 {
        population.evaluate_fitness(reach_one);
        let stats = population.evolve().unwrap();
        assert_eq!(stats.generation, generation);
        assert!(stats.best_fitness >= best);
        assert_eq!(population.best_fitness_seen(), Some(stats.best_fitness));
        best = stats.best_fitness;

        assert_eq!(population.clients().len(), 50);
        let members: usize = population.species().map(|s| s.len()).sum();
        assert_eq!(members, 50);
        assert!(population.clients().iter().all(|c| c.species().is_some()));
        assert_eq!(population.phase(), Phase::Evaluating);
    }
}

#[test]
fn parallel_and_sequential_evaluation_agree() {
    let mut sequential = Population::<NNGenome>::new(population_config(11), genetic_config());
    let mut parallel = Population::<NNGenome>::new(population_config(11), genetic_config());
    for _ in 0..5 {
        sequential.evaluate_fitness(reach_one);
        parallel.evaluate_fitness_parallel(reach_one);
        assert_eq!(sequential.evolve().unwrap(), parallel.evolve().unwrap());
    }
}

#[test]
fn generous_timeouts_lose_no_scores() {
    let mut timed = Population::<NNGenome>::new(population_config(13), genetic_config());
    let mut sequential = Population::<NNGenome>::new(population_config(13), genetic_config());
    timed.evaluate_fitness_with_timeout(Duration::from_secs(30), Arc::new(reach_one));
    sequential.evaluate_fitness(reach_one);
    let scores = |p: &Population<NNGenome>| p.clients().iter().map(|c| c.score()).collect::<Vec<_>>();
    assert_eq!(scores(&timed), scores(&sequential));
}

#[test]
fn seeding_from_snapshots() {
    let mut population = Population::<NNGenome>::new(population_config(17), genetic_config());
    for _ in 0..3 {
        population.evaluate_fitness(reach_one);
        population.evolve().unwrap();
    }
    population.evaluate_fitness(reach_one);
    let champion = population.champion();
    let champion_score = champion.fitness();

    let document = serde_json::to_string(&champion.genome().snapshot()).unwrap();
    let snapshot: GenomeSnapshot = serde_json::from_str(&document).unwrap();
    let genome = NNGenome::from_snapshot(snapshot).unwrap();

    let mut seeded =
        Population::new_seeded(vec![genome], population_config(19), genetic_config()).unwrap();
    seeded.evaluate_fitness(reach_one);
    assert_eq!(seeded.clients()[0].fitness(), champion_score);
    assert!(seeded.champion().fitness() >= champion_score);
}

#[test]
fn seeding_rejects_nonconforming_genomes() {
    let other_config = GeneticConfig {
        input_count: NonZeroUsize::new(5).unwrap(),
        ..genetic_config()
    };
    let mut rng = evoneat::rng::seeded(Some(0));
    let genome = NNGenome::new(&other_config, &mut rng);
    assert!(Population::new_seeded(vec![genome], population_config(1), genetic_config()).is_none());
}

#[test]
fn logging_species_champions() {
    let mut population = Population::<NNGenome>::new(population_config(23), genetic_config());
    let mut logger = EvolutionLogger::new(ReportingLevel::SpeciesChampions);
    for _ in 0..3 {
        population.evaluate_fitness(reach_one);
        logger.log(
            &population,
            &|c| [c.fitness(), c.genome().connections().count() as f32],
            ["fitness", "connections"],
        );
        population.evolve().unwrap();
    }

    let logs: Vec<_> = logger.iter().collect();
    assert_eq!(logs.len(), 3);
    for (generation, log) in logs.iter().enumerate() {
        assert_eq!(log.generation_number, generation);
        assert_eq!(log.client_stats[0].0, "fitness");
        assert!(log.client_stats[0].1.maximum <= 1.0);
        match &log.generation_sample {
            GenerationMemberRecord::SpeciesChampions(champions) => {
                assert_eq!(champions.len(), log.species_count)
            }
            _ => panic!("wrong reporting level"),
        }
    }
}
