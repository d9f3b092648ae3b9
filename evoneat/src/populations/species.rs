use super::{Client, PopulationConfig};
use crate::Genome;

use serde::{Deserialize, Serialize};

/// Species identifier. Specifies
/// the generation in which the species
/// was born, and the count of other species
/// generated in the _same generation_ before
/// the one identified (i.e, if it was the
/// third species born in generation 5, it
/// will be species [5, 2]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesID(pub usize, pub usize);

/// Species are collections of reproductively
/// compatible (within a certain [genetic distance])
/// clients. Membership is determined by calculating
/// the genetic distance to a _representative_, which
/// stays fixed for a whole generation and is replaced
/// by a randomly chosen member at each generation
/// boundary.
///
/// Members are referenced by their index in the
/// population's client list; the species does not
/// own them.
///
/// Species stagnate after [`stagnation_limit`]
/// generations without improving their best fitness,
/// and are thereafter barred from reproduction.
///
/// [genetic distance]: PopulationConfig::compatibility_threshold
/// [`stagnation_limit`]: PopulationConfig::stagnation_limit
#[derive(Debug, Clone)]
pub struct Species<G> {
    id: SpeciesID,
    representative: G,
    members: Vec<usize>,
    best_fitness: f32,
    stagnation: usize,
    adjusted_fitness: f32,
}

impl<G: Genome> Species<G> {
    /// Creates a new, memberless species with the
    /// specified ID and representative.
    ///
    /// # Examples
    /// ```
    /// use evoneat::{Species, SpeciesID};
    /// use evoneat_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let mut rng = evoneat::rng::seeded(Some(0));
    /// let species = Species::new(
    ///     SpeciesID(1, 0),
    ///     NNGenome::new(&GeneticConfig::zero(), &mut rng),
    /// );
    ///
    /// assert_eq!(species.id(), SpeciesID(1, 0));
    /// assert!(species.is_empty());
    /// ```
    pub fn new(id: SpeciesID, representative: G) -> Species<G> {
        Species {
            id,
            representative,
            members: vec![],
            best_fitness: f32::MIN,
            stagnation: 0,
            adjusted_fitness: 0.0,
        }
    }

    /// Returns the species' ID.
    pub fn id(&self) -> SpeciesID {
        self.id
    }

    /// Returns the species' representative.
    pub fn representative(&self) -> &G {
        &self.representative
    }

    /// Returns the genetic distance between the species'
    /// representative and `other`.
    ///
    /// # Examples
    /// ```
    /// use evoneat::{Species, SpeciesID};
    /// use evoneat_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let config = GeneticConfig {
    ///     disjoint_gene_factor: 1.0,
    ///     excess_gene_factor: 1.0,
    ///     common_weight_factor: 0.4,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut rng = evoneat::rng::seeded(Some(0));
    /// let representative = NNGenome::new(&config, &mut rng);
    /// let species = Species::new(SpeciesID(1, 0), representative.clone());
    ///
    /// assert_eq!(species.genetic_distance(&representative, &config), 0.0);
    /// ```
    pub fn genetic_distance(&self, other: &G, config: &G::Config) -> f32 {
        G::genetic_distance(&self.representative, other, config)
    }

    /// Returns the indices of the species' members
    /// in the population's client list.
    pub fn members(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied()
    }

    /// Returns the number of members in the species.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns whether the species has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns the best raw fitness any member
    /// of the species has achieved.
    pub fn best_fitness(&self) -> f32 {
        self.best_fitness
    }

    /// Returns the number of consecutive generations
    /// the species has gone without improving its
    /// best fitness.
    pub fn time_stagnated(&self) -> usize {
        self.stagnation
    }

    /// Returns the sum of the members' adjusted fitnesses.
    pub fn adjusted_fitness(&self) -> f32 {
        self.adjusted_fitness
    }

    /// Returns whether the species has stagnated
    /// for longer than allowed.
    pub fn is_stagnant(&self, config: &PopulationConfig) -> bool {
        self.stagnation >= config.stagnation_limit.get()
    }

    pub(super) fn add_member(&mut self, client: usize) {
        self.members.push(client);
    }

    pub(super) fn clear_members(&mut self) {
        self.members.clear();
    }

    pub(super) fn set_representative(&mut self, representative: G) {
        self.representative = representative;
    }

    /// Updates the species' record of best fitness,
    /// increasing its stagnation counter if it was
    /// not improved upon.
    pub(super) fn update_stagnation(&mut self, clients: &[Client<G>]) {
        let max_fitness = self
            .members
            .iter()
            .map(|&i| clients[i].fitness())
            .fold(f32::MIN, f32::max);
        if max_fitness > self.best_fitness {
            self.best_fitness = max_fitness;
            self.stagnation = 0;
        } else {
            self.stagnation += 1;
        }
    }

    /// Divides each member's fitness by the species size,
    /// recording the result on the members and the sum
    /// on the species.
    pub(super) fn share_fitness(&mut self, clients: &mut [Client<G>]) {
        let size = self.members.len().max(1) as f32;
        self.adjusted_fitness = 0.0;
        for &i in &self.members {
            let adjusted = clients[i].fitness() / size;
            clients[i].set_adjusted_fitness(adjusted);
            self.adjusted_fitness += adjusted;
        }
    }

    /// Returns the members' indices, sorted
    /// by decreasing raw fitness.
    pub(super) fn ranked_members(&self, clients: &[Client<G>]) -> Vec<usize> {
        let mut ranked = self.members.clone();
        ranked.sort_by(|&a, &b| clients[b].fitness().total_cmp(&clients[a].fitness()));
        ranked
    }

    /// Returns the index of the species' best member,
    /// or `None` if the species is empty.
    pub fn champion(&self, clients: &[Client<G>]) -> Option<usize> {
        self.members
            .iter()
            .copied()
            .max_by(|&a, &b| clients[a].fitness().total_cmp(&clients[b].fitness()))
    }

    pub(super) fn count_elite(&self, config: &PopulationConfig) -> usize {
        if self.members.len() >= config.elitism_min_species_size {
            self.members.len().min(config.elitism)
        } else {
            0
        }
    }

    pub(super) fn count_survivors(&self, config: &PopulationConfig) -> usize {
        ((self.members.len() as f32 * config.survival_threshold).ceil() as usize)
            .clamp(1, self.members.len().max(1))
    }
}
