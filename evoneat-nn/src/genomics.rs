//! Genetic encoding of neural networks: node and connection
//! genes, the genomes made of them, and the bookkeeping
//! of their historical markers.
mod config;
mod crossover;
mod errors;
mod genes;
mod history;
mod mutation;
mod nodes;
mod snapshot;

pub use config::GeneticConfig;
pub use errors::{SkipReason, SnapshotError};
pub use genes::{ConnectionGene, Gene};
pub use history::{InnovationTracker, SplitInnovation};
pub use mutation::MutationReport;
pub use nodes::{NodeGene, NodeRole, OUTPUT_X, SENSOR_X};
pub use snapshot::{ConnectionRecord, GenomeSnapshot, NodeRecord};

use crate::networks::{Calculator, NetworkError};
use crate::Innovation;

use evoneat::Genome;
use rand::Rng;
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::fmt;

/// The genetic encoding of a neural network: a set
/// of nodes and a set of weighted connections
/// between them, both keyed by their markers.
///
/// Genomes (de)serialize through [`GenomeSnapshot`],
/// so malformed documents are rejected as a whole.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GenomeSnapshot", into = "GenomeSnapshot")]
pub struct NNGenome {
    nodes: BTreeMap<Innovation, NodeGene>,
    connections: BTreeMap<Innovation, ConnectionGene>,
    fitness: f32,
}

impl NNGenome {
    /// Creates a new genome with the configured number of
    /// input, bias and output nodes, and no hidden nodes.
    /// Each sensor-output pair is connected with probability
    /// [`initial_expression_chance`], using the pair's
    /// reserved innovation number and a random weight.
    ///
    /// [`initial_expression_chance`]: GeneticConfig::initial_expression_chance
    ///
    /// # Examples
    /// ```
    /// use evoneat_nn::genomics::{Gene, GeneticConfig, NNGenome, NodeRole};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     bias: true,
    ///     initial_expression_chance: 1.0,
    ///     weight_bound: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut rng = evoneat::rng::seeded(Some(0));
    /// let genome = NNGenome::new(&config, &mut rng);
    ///
    /// // As configured, the genome should have 3 inputs, a bias, and 2 outputs.
    /// assert_eq!(genome.nodes().count(), 3 + 1 + 2);
    /// assert_eq!(genome.nodes().filter(|n| n.role() == NodeRole::Output).count(), 2);
    ///
    /// // And with an initial_expression_chance of 1, there is a connection for every sensor-output pair.
    /// assert_eq!(genome.connections().count(), 4 * 2);
    /// assert!(genome.connections().all(|c| (0..4 * 2).contains(&c.innovation())));
    /// assert!(genome.connections().all(|c| c.weight().abs() <= config.weight_bound));
    /// ```
    pub fn new<R: Rng + ?Sized>(config: &GeneticConfig, rng: &mut R) -> NNGenome {
        let mut genome = NNGenome::with_io_nodes(config);
        let sensor_count = config.sensor_count();
        let output_count = config.output_count.get();

        for s in 0..sensor_count {
            for o in 0..output_count {
                if rng.gen::<f32>() < config.initial_expression_chance {
                    let id = o + s * output_count;
                    let weight = ConnectionGene::random_weight(config, rng);
                    genome
                        .connections
                        .insert(id, ConnectionGene::new(id, s, sensor_count + o, weight));
                }
            }
        }

        genome
    }

    /// Creates a genome with the configured sensor and
    /// output nodes, and no connections.
    fn with_io_nodes(config: &GeneticConfig) -> NNGenome {
        let input_count = config.input_count.get();
        let sensor_count = config.sensor_count();
        let output_count = config.output_count.get();
        let spread = |i: usize, n: usize| (i + 1) as f32 / (n + 1) as f32;

        let mut nodes = BTreeMap::new();
        for s in 0..sensor_count {
            let role = if s < input_count {
                NodeRole::Input
            } else {
                NodeRole::Bias
            };
            nodes.insert(s, NodeGene::new(s, role, SENSOR_X, spread(s, sensor_count)));
        }
        for o in 0..output_count {
            let id = sensor_count + o;
            nodes.insert(
                id,
                NodeGene::new(id, NodeRole::Output, OUTPUT_X, spread(o, output_count)),
            );
        }

        NNGenome {
            nodes,
            connections: BTreeMap::new(),
            fitness: 0.0,
        }
    }

    /// Adds a node to the genome.
    ///
    /// # Errors
    /// Returns an error, leaving the genome unchanged,
    /// if a node with the same id already exists.
    pub fn add_node(&mut self, node: NodeGene) -> Result<&NodeGene, SkipReason> {
        if self.nodes.contains_key(&node.id()) {
            return Err(SkipReason::DuplicateNode(node.id()));
        }
        Ok(self.nodes.entry(node.id()).or_insert(node))
    }

    /// Adds a connection to the genome.
    ///
    /// # Errors
    /// Returns an error, leaving the genome unchanged, if a
    /// connection with the same innovation number or the same
    /// endpoints already exists, if either endpoint is missing,
    /// if the target is a sensor, or if the connection is a
    /// self-loop and `allow_recurrent` is false.
    ///
    /// # Examples
    /// ```
    /// use evoneat_nn::genomics::{ConnectionGene, GeneticConfig, NNGenome, SkipReason};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut rng = evoneat::rng::seeded(Some(0));
    /// let mut genome = NNGenome::new(&config, &mut rng);
    ///
    /// // Inputs are 0 and 1, the output is 2.
    /// assert!(genome.add_connection(ConnectionGene::new(42, 0, 2, 2.5), false).is_ok());
    /// assert_eq!(
    ///     genome.add_connection(ConnectionGene::new(42, 1, 2, 1.0), false),
    ///     Err(SkipReason::DuplicateInnovation(42)),
    /// );
    /// assert_eq!(
    ///     genome.add_connection(ConnectionGene::new(43, 2, 2, 1.0), false),
    ///     Err(SkipReason::SelfLoop(2)),
    /// );
    /// assert_eq!(
    ///     genome.add_connection(ConnectionGene::new(44, 2, 0, 1.0), true),
    ///     Err(SkipReason::SensorTarget(0)),
    /// );
    /// ```
    pub fn add_connection(
        &mut self,
        connection: ConnectionGene,
        allow_recurrent: bool,
    ) -> Result<&ConnectionGene, SkipReason> {
        let (input, output) = connection.endpoints();
        if self.connections.contains_key(&connection.innovation()) {
            return Err(SkipReason::DuplicateInnovation(connection.innovation()));
        }
        let target = match (self.nodes.get(&input), self.nodes.get(&output)) {
            (None, _) => return Err(SkipReason::MissingEndpoint(input)),
            (_, None) => return Err(SkipReason::MissingEndpoint(output)),
            (Some(_), Some(target)) => target,
        };
        if target.role().is_sensor() {
            return Err(SkipReason::SensorTarget(output));
        }
        if input == output && !allow_recurrent {
            return Err(SkipReason::SelfLoop(input));
        }
        if self.has_connection_between(input, output) {
            return Err(SkipReason::DuplicateEndpoints(input, output));
        }
        Ok(self
            .connections
            .entry(connection.innovation())
            .or_insert(connection))
    }

    /// Returns whether a connection from `input`
    /// to `output` exists, enabled or not.
    pub fn has_connection_between(&self, input: Innovation, output: Innovation) -> bool {
        self.connections
            .values()
            .any(|c| c.endpoints() == (input, output))
    }

    /// Returns the compatibility distance between two genomes.
    ///
    /// Connections are aligned by innovation number. Those
    /// missing from the other genome count as _excess_ if their
    /// innovation number is above the other genome's maximum,
    /// and as _disjoint_ otherwise. The distance is
    ///
    /// `c1 * excess / N + c2 * disjoint / N + c3 * W`
    ///
    /// where `W` is the mean absolute weight difference of
    /// matching connections (0 if there are none), and `N` is
    /// the connection count of the larger genome, or 1 if it
    /// is smaller than [`small_genome_threshold`].
    ///
    /// [`small_genome_threshold`]: GeneticConfig::small_genome_threshold
    ///
    /// # Examples
    /// ```
    /// use evoneat_nn::genomics::{ConnectionGene, GeneticConfig, NNGenome};
    /// use std::num::NonZeroUsize;
    ///
    /// const EXCESS_FACTOR: f32 = 1.0;
    /// const DISJOINT_FACTOR: f32 = 2.0;
    /// const WEIGHT_FACTOR: f32 = 0.5;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     excess_gene_factor: EXCESS_FACTOR,
    ///     disjoint_gene_factor: DISJOINT_FACTOR,
    ///     common_weight_factor: WEIGHT_FACTOR,
    ///     small_genome_threshold: 20,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut rng = evoneat::rng::seeded(Some(0));
    /// let mut genome1 = NNGenome::new(&config, &mut rng);
    /// let mut genome2 = genome1.clone();
    ///
    /// // Common genes, with weight differences of 2 and 0.
    /// genome1.add_connection(ConnectionGene::new(0, 0, 3, 1.0), false).unwrap();
    /// genome2.add_connection(ConnectionGene::new(0, 0, 3, 3.0), false).unwrap();
    /// genome1.add_connection(ConnectionGene::new(4, 2, 3, 1.0), false).unwrap();
    /// genome2.add_connection(ConnectionGene::new(4, 2, 3, 1.0), false).unwrap();
    /// // Disjoint genes.
    /// genome1.add_connection(ConnectionGene::new(1, 0, 4, 1.0), false).unwrap();
    /// genome2.add_connection(ConnectionGene::new(2, 1, 3, 1.0), false).unwrap();
    /// // Excess gene.
    /// genome1.add_connection(ConnectionGene::new(5, 2, 4, 1.0), false).unwrap();
    ///
    /// let distance = genome1.distance(&genome2, &config);
    /// assert_eq!(distance, genome2.distance(&genome1, &config));
    /// assert_eq!(
    ///     distance,
    ///     EXCESS_FACTOR * 1.0 + DISJOINT_FACTOR * 2.0 + WEIGHT_FACTOR * (2.0 + 0.0) / 2.0
    /// );
    /// ```
    pub fn distance(&self, other: &NNGenome, config: &GeneticConfig) -> f32 {
        let (excess, disjoint, weight_difference) = self.alignment(other);
        let larger = self.connections.len().max(other.connections.len());
        let n = if larger < config.small_genome_threshold {
            1.0
        } else {
            larger.max(1) as f32
        };
        config.excess_gene_factor * excess as f32 / n
            + config.disjoint_gene_factor * disjoint as f32 / n
            + config.common_weight_factor * weight_difference
    }

    /// Returns the excess and disjoint connection counts, and the
    /// mean absolute weight difference of matching connections.
    fn alignment(&self, other: &NNGenome) -> (usize, usize, f32) {
        let (mut excess, mut disjoint) = (0, 0);
        let (mut matching, mut weight_difference) = (0, 0.0);

        let self_max = self.max_innovation();
        let other_max = other.max_innovation();
        let mut unmatched = |id: Innovation, max: Option<Innovation>| {
            if max.map_or(true, |max| id > max) {
                excess += 1;
            } else {
                disjoint += 1;
            }
        };

        for (id, connection) in &self.connections {
            match other.connections.get(id) {
                Some(counterpart) => {
                    matching += 1;
                    weight_difference += (connection.weight() - counterpart.weight()).abs();
                }
                None => unmatched(*id, other_max),
            }
        }
        for id in other.connections.keys() {
            if !self.connections.contains_key(id) {
                unmatched(*id, self_max);
            }
        }

        let mean_difference = if matching == 0 {
            0.0
        } else {
            weight_difference / matching as f32
        };
        (excess, disjoint, mean_difference)
    }

    /// Returns the highest connection innovation
    /// number in the genome.
    pub fn max_innovation(&self) -> Option<Innovation> {
        self.connections.keys().next_back().copied()
    }

    /// Returns an iterator over the genome's connections,
    /// in increasing innovation order.
    pub fn connections(&self) -> impl Iterator<Item = &ConnectionGene> {
        self.connections.values()
    }

    /// Returns an iterator over the genome's nodes,
    /// in increasing id order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeGene> {
        self.nodes.values()
    }

    pub fn connection(&self, innovation: Innovation) -> Option<&ConnectionGene> {
        self.connections.get(&innovation)
    }

    pub fn node(&self, id: Innovation) -> Option<&NodeGene> {
        self.nodes.get(&id)
    }

    /// Returns the ids of the nodes with the specified
    /// role, in increasing order.
    pub fn node_ids(&self, role: NodeRole) -> impl Iterator<Item = Innovation> + '_ {
        self.nodes
            .values()
            .filter(move |n| n.role() == role)
            .map(NodeGene::id)
    }

    /// Returns the number of enabled connections.
    pub fn enabled_connection_count(&self) -> usize {
        self.connections.values().filter(|c| c.enabled()).count()
    }

    /// Sets the genome's fitness to the value passed.
    /// Fitness should be a positive quantity.
    pub fn set_fitness(&mut self, fitness: f32) {
        self.fitness = fitness;
    }

    /// Returns a the genome's current fitness.
    pub fn fitness(&self) -> f32 {
        self.fitness
    }
}

impl Genome for NNGenome {
    type Config = GeneticConfig;
    type InnovationHistory = InnovationTracker;
    type Phenotype = Calculator;

    fn new<R: Rng + ?Sized>(config: &GeneticConfig, rng: &mut R) -> NNGenome {
        Self::new(config, rng)
    }

    fn genetic_distance(first: &NNGenome, second: &NNGenome, config: &GeneticConfig) -> f32 {
        first.distance(second, config)
    }

    fn mate<R: Rng + ?Sized>(
        parent1: &NNGenome,
        parent2: &NNGenome,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> NNGenome {
        parent1.crossover(parent2, parent1.fitness, parent2.fitness, config, rng)
    }

    fn mutate<R: Rng + ?Sized>(
        &mut self,
        history: &mut InnovationTracker,
        config: &GeneticConfig,
        rng: &mut R,
    ) {
        self.mutate_all(history, config, rng);
    }

    fn express(&self, config: &GeneticConfig) -> Result<Calculator, NetworkError> {
        Calculator::new(self, config)
    }

    fn conforms_to(&self, config: &GeneticConfig) -> bool {
        self.node_ids(NodeRole::Input).count() == config.input_count.get()
            && self.node_ids(NodeRole::Output).count() == config.output_count.get()
            && self.node_ids(NodeRole::Bias).count() == usize::from(config.bias)
    }

    fn advance_history(&self, history: &mut InnovationTracker) {
        let max_node = self.nodes.keys().next_back().copied().unwrap_or(0);
        let max_connection = self.max_innovation().unwrap_or(0);
        history.reserve_past(max_node, max_connection);
    }

    fn set_fitness(&mut self, fitness: f32) {
        self.fitness = fitness;
    }

    fn fitness(&self) -> f32 {
        self.fitness
    }
}

impl fmt::Display for NNGenome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let connections: Vec<String> = self.connections.values().map(|c| c.to_string()).collect();
        let nodes: Vec<String> = self.nodes.values().map(|n| n.to_string()).collect();
        f.debug_struct("Genome")
            .field("Connections", &connections)
            .field("Nodes", &nodes)
            .field("Fitness", &self.fitness)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::num::NonZeroUsize;

    fn config(inputs: usize, outputs: usize) -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::new(inputs).unwrap(),
            output_count: NonZeroUsize::new(outputs).unwrap(),
            weight_bound: 3.0,
            excess_gene_factor: 1.0,
            disjoint_gene_factor: 1.0,
            common_weight_factor: 0.4,
            ..GeneticConfig::zero()
        }
    }

    #[test]
    fn new_fully_connected() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for input_count in 1..6 {
            for output_count in 1..6 {
                let config = GeneticConfig {
                    initial_expression_chance: 1.0,
                    bias: true,
                    ..config(input_count, output_count)
                };
                let genome = NNGenome::new(&config, &mut rng);
                let sensors = input_count + 1;
                assert_eq!(genome.nodes().count(), sensors + output_count);
                assert_eq!(genome.connections().count(), sensors * output_count);
                for connection in genome.connections() {
                    let (input, output) = connection.endpoints();
                    assert!(input < sensors);
                    assert!((sensors..sensors + output_count).contains(&output));
                    assert_eq!(
                        connection.innovation(),
                        output - sensors + input * output_count
                    );
                }
            }
        }
    }

    #[test]
    fn new_unconnected() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let genome = NNGenome::new(&config(4, 2), &mut rng);
        assert_eq!(genome.connections().count(), 0);
        assert_eq!(genome.node_ids(NodeRole::Input).collect::<Vec<_>>(), [0, 1, 2, 3]);
        assert_eq!(genome.node_ids(NodeRole::Output).collect::<Vec<_>>(), [4, 5]);
        assert_eq!(genome.node_ids(NodeRole::Bias).count(), 0);
    }

    #[test]
    fn sensors_and_outputs_are_laid_out_in_columns() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let genome = NNGenome::new(&config(3, 2), &mut rng);
        for node in genome.nodes() {
            match node.role() {
                NodeRole::Output => assert_eq!(node.x(), OUTPUT_X),
                _ => assert_eq!(node.x(), SENSOR_X),
            }
            assert!(node.y() > 0.0 && node.y() < 1.0);
        }
    }

    #[test]
    fn add_connection_rejections_leave_genome_unchanged() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut genome = NNGenome::new(&config(2, 1), &mut rng);
        genome
            .add_connection(ConnectionGene::new(0, 0, 2, 1.0), false)
            .unwrap();
        let before = genome.clone();

        assert_eq!(
            genome.add_connection(ConnectionGene::new(9, 0, 2, 1.0), false),
            Err(SkipReason::DuplicateEndpoints(0, 2))
        );
        assert_eq!(
            genome.add_connection(ConnectionGene::new(9, 0, 7, 1.0), false),
            Err(SkipReason::MissingEndpoint(7))
        );
        assert_eq!(
            genome.add_connection(ConnectionGene::new(9, 7, 2, 1.0), false),
            Err(SkipReason::MissingEndpoint(7))
        );
        assert_eq!(genome, before);
    }

    #[test]
    fn self_loops_need_recurrence() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut genome = NNGenome::new(&config(1, 1), &mut rng);
        assert!(genome
            .add_connection(ConnectionGene::new(5, 1, 1, 1.0), true)
            .is_ok());
    }

    #[test]
    fn add_node_rejects_duplicates() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut genome = NNGenome::new(&config(1, 1), &mut rng);
        assert!(genome.add_node(NodeGene::new(5, NodeRole::Hidden, 0.5, 0.5)).is_ok());
        assert_eq!(
            genome.add_node(NodeGene::new(5, NodeRole::Hidden, 0.3, 0.3)),
            Err(SkipReason::DuplicateNode(5))
        );
        assert_eq!(genome.node(5).unwrap().x(), 0.5);
    }

    #[test]
    fn distance_to_clone_is_zero() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let config = GeneticConfig {
            initial_expression_chance: 0.5,
            ..config(4, 3)
        };
        let genome = NNGenome::new(&config, &mut rng);
        assert_eq!(genome.distance(&genome.clone(), &config), 0.0);
    }

    #[test]
    fn distance_to_empty_genome_counts_excess() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let full = NNGenome::new(
            &GeneticConfig {
                initial_expression_chance: 1.0,
                ..config(2, 2)
            },
            &mut rng,
        );
        let empty = NNGenome::new(&config(2, 2), &mut rng);
        assert_eq!(full.distance(&empty, &config(2, 2)), 4.0);
        assert_eq!(empty.distance(&full, &config(2, 2)), 4.0);
    }

    #[test]
    fn large_genomes_are_normalized_by_size() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let config = GeneticConfig {
            initial_expression_chance: 1.0,
            small_genome_threshold: 4,
            ..config(2, 2)
        };
        let full = NNGenome::new(&config, &mut rng);
        let empty = NNGenome::new(
            &GeneticConfig {
                initial_expression_chance: 0.0,
                ..config.clone()
            },
            &mut rng,
        );
        assert_eq!(full.distance(&empty, &config), 1.0);
    }

    #[test]
    fn conformance_checks_io_counts() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let genome = NNGenome::new(&config(2, 1), &mut rng);
        assert!(genome.conforms_to(&config(2, 1)));
        assert!(!genome.conforms_to(&config(3, 1)));
        assert!(!genome.conforms_to(&GeneticConfig {
            bias: true,
            ..config(2, 1)
        }));
    }

    #[test]
    fn expressing_without_outputs_fails() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut genome = NNGenome::new(&config(2, 1), &mut rng);
        genome.nodes.retain(|_, n| n.role() != NodeRole::Output);
        assert_eq!(
            genome.express(&config(2, 1)).map(|_| ()),
            Err(NetworkError::NoOutputs)
        );
    }
}
