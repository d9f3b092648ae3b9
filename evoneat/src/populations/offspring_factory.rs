use super::{Client, PopulationConfig, Species};
use crate::Genome;

use rand::distributions::WeightedIndex;
use rand::prelude::{Distribution, IteratorRandom, Rng};

/// A genome produced for the next generation.
pub(super) struct Offspring<G> {
    pub(super) genome: G,
    /// Elites are copied unchanged and must not be mutated.
    pub(super) elite: bool,
}

/// Auxiliary type for offspring generation.
/// Handles all the tasks of generating a population's
/// offspring according to the specified configs
/// and allotted offspring.
pub(super) struct OffspringFactory<'a, G: Genome, R: Rng + ?Sized> {
    species: &'a [Species<G>],
    clients: &'a [Client<G>],
    genetic_config: &'a G::Config,
    population_config: &'a PopulationConfig,
    champion: Option<usize>,
    rng: &'a mut R,
}

impl<'a, G: Genome, R: Rng + ?Sized> OffspringFactory<'a, G, R> {
    pub(super) fn new(
        species: &'a [Species<G>],
        clients: &'a [Client<G>],
        genetic_config: &'a G::Config,
        population_config: &'a PopulationConfig,
        champion: Option<usize>,
        rng: &'a mut R,
    ) -> OffspringFactory<'a, G, R> {
        OffspringFactory {
            species,
            clients,
            genetic_config,
            population_config,
            champion,
            rng,
        }
    }

    /// Generate the alloted offspring.
    pub(super) fn generate_offspring(&mut self, allotted_offspring: &[usize]) -> Vec<Offspring<G>> {
        let all_species = self.species;
        let mut offspring = Vec::with_capacity(allotted_offspring.iter().sum());

        for (species_index, &allotted) in allotted_offspring.iter().enumerate() {
            let species = &all_species[species_index];
            if allotted == 0 || species.is_empty() {
                continue;
            }
            let ranked = species.ranked_members(self.clients);

            let mut elite = species.count_elite(self.population_config);
            if self.champion.map_or(false, |c| ranked.contains(&c)) {
                elite = elite.max(1);
            }
            let elite = elite.min(allotted);
            let survivors = species.count_survivors(self.population_config);

            self.add_species_elite(&ranked[..elite], &mut offspring);
            self.add_bred_offspring(
                species_index,
                &ranked[..survivors],
                allotted - elite,
                &mut offspring,
            );
        }

        offspring
    }

    /// Add the top "elite" members of the species
    /// to the offspring.
    fn add_species_elite(&self, elite: &[usize], offspring: &mut Vec<Offspring<G>>) {
        offspring.extend(elite.iter().map(|&i| Offspring {
            genome: self.clients[i].genome().clone(),
            elite: true,
        }));
    }

    /// Choose parents from the species' survivors, or
    /// from other species, and breed them, adding the
    /// children to the offspring.
    fn add_bred_offspring(
        &mut self,
        species_index: usize,
        parents: &[usize],
        count: usize,
        offspring: &mut Vec<Offspring<G>>,
    ) {
        let clients = self.clients;
        let weights: Vec<f32> = parents.iter().map(|&i| clients[i].adjusted_fitness()).collect();
        // Zero-fitness species fall back to uniform selection.
        let roulette = WeightedIndex::new(&weights).ok();

        for _ in 0..count {
            let parent1 = self.select_parent(parents, roulette.as_ref());
            let genome = if self.rng.gen::<f32>() < self.population_config.sexual_reproduction_chance {
                let parent2 = self.choose_second_parent(species_index, parents, roulette.as_ref());
                G::mate(
                    clients[parent1].genome(),
                    clients[parent2].genome(),
                    self.genetic_config,
                    &mut *self.rng,
                )
            } else {
                clients[parent1].genome().clone()
            };
            offspring.push(Offspring {
                genome,
                elite: false,
            });
        }
    }

    /// Roulette-wheel selection over adjusted fitness.
    ///
    /// `parents` is never empty: every bred species
    /// keeps at least one survivor.
    fn select_parent(&mut self, parents: &[usize], roulette: Option<&WeightedIndex<f32>>) -> usize {
        debug_assert!(!parents.is_empty());
        match roulette {
            Some(roulette) => parents[roulette.sample(&mut *self.rng)],
            None => parents[self.rng.gen_range(0..parents.len())],
        }
    }

    /// Choose a parent from the current species,
    /// or from another randomly selected.
    fn choose_second_parent(
        &mut self,
        species_index: usize,
        parents: &[usize],
        roulette: Option<&WeightedIndex<f32>>,
    ) -> usize {
        let all_species = self.species;
        if all_species.len() > 1
            && self.rng.gen::<f32>() < self.population_config.interspecies_mating_chance
        {
            let other = all_species
                .iter()
                .enumerate()
                .filter(|(i, s)| *i != species_index && !s.is_empty())
                .map(|(_, s)| s)
                .choose(&mut *self.rng);
            if let Some(member) = other.and_then(|s| s.members().choose(&mut *self.rng)) {
                return member;
            }
        }
        self.select_parent(parents, roulette)
    }
}
