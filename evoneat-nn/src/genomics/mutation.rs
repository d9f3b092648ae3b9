use crate::genomics::{
    ConnectionGene, Gene, GeneticConfig, InnovationTracker, NNGenome, NodeGene, NodeRole,
    SkipReason, SplitInnovation,
};
use crate::Innovation;

use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use tracing::debug;

/// Outcome of the structural mutations attempted by
/// [`NNGenome::mutate_all`]. `None` means the mutation
/// was not rolled; `Some(Err(_))` means it was rolled
/// but left the genome unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationReport {
    pub added_node: Option<Result<SplitInnovation, SkipReason>>,
    pub added_connection: Option<Result<Innovation, SkipReason>>,
    pub toggled: Option<Result<Innovation, SkipReason>>,
}

impl MutationReport {
    /// Returns whether any structural mutation
    /// changed the genome.
    pub fn changed_structure(&self) -> bool {
        matches!(self.added_node, Some(Ok(_)))
            || matches!(self.added_connection, Some(Ok(_)))
            || matches!(self.toggled, Some(Ok(_)))
    }

    fn skips(&self) -> impl Iterator<Item = (&'static str, SkipReason)> + '_ {
        let node = self.added_node.and_then(Result::err).map(|r| ("add-node", r));
        let connection = self
            .added_connection
            .and_then(Result::err)
            .map(|r| ("add-connection", r));
        let toggle = self.toggled.and_then(Result::err).map(|r| ("toggle-enable", r));
        node.into_iter().chain(connection).chain(toggle)
    }
}

impl NNGenome {
    /// Mutates the weights of the genome's connections.
    /// Each weight is perturbed with probability
    /// [`weight_perturb_chance`], and otherwise reset to
    /// a random value with probability [`weight_reset_chance`].
    ///
    /// [`weight_perturb_chance`]: GeneticConfig::weight_perturb_chance
    /// [`weight_reset_chance`]: GeneticConfig::weight_reset_chance
    ///
    /// # Examples
    /// ```
    /// use evoneat_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let config = GeneticConfig {
    ///     initial_expression_chance: 1.0,
    ///     weight_bound: 5.0,
    ///     weight_perturb_chance: 1.0,
    ///     weight_perturb_power: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut rng = evoneat::rng::seeded(Some(9));
    /// let mut genome = NNGenome::new(&config, &mut rng);
    ///
    /// genome.mutate_weights(&config, &mut rng);
    ///
    /// // Weights are still within bounds.
    /// assert!(genome.connections().all(|c| c.weight().abs() <= config.weight_bound));
    /// ```
    pub fn mutate_weights<R: Rng + ?Sized>(&mut self, config: &GeneticConfig, rng: &mut R) {
        for connection in self.connections.values_mut() {
            if rng.gen::<f32>() < config.weight_perturb_chance {
                connection.perturb_weight(config, rng);
            } else if rng.gen::<f32>() < config.weight_reset_chance {
                connection.randomize_weight(config, rng);
            }
        }
    }

    /// Induces an _add-connection_ mutation in the genome.
    /// Random node pairs are tried up to
    /// [`max_connection_addition_attempts`] times, and the
    /// first legal, unconnected pair gets a new enabled
    /// connection with a random weight.
    ///
    /// If recurrence is disallowed, the connection always
    /// goes from the node with the lower x coordinate to
    /// the one with the higher, and pairs at the same x
    /// are rejected.
    ///
    /// [`max_connection_addition_attempts`]: GeneticConfig::max_connection_addition_attempts
    ///
    /// # Errors
    /// Returns [`SkipReason::NoConnectablePair`], leaving
    /// the genome unchanged, if every attempt failed.
    ///
    /// # Examples
    /// ```
    /// use evoneat_nn::genomics::{GeneticConfig, InnovationTracker, NNGenome};
    ///
    /// let config = GeneticConfig {
    ///     weight_bound: 5.0,
    ///     max_connection_addition_attempts: 50,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut rng = evoneat::rng::seeded(Some(1));
    /// let mut genome = NNGenome::new(&config, &mut rng);
    ///
    /// // The genome is initially empty.
    /// assert_eq!(genome.connections().count(), 0);
    ///
    /// let mut tracker = InnovationTracker::new(&config);
    /// genome.mutate_add_connection(&mut tracker, &config, &mut rng).unwrap();
    ///
    /// // The single input is now connected to the single output.
    /// assert!(genome.has_connection_between(0, 1));
    /// ```
    pub fn mutate_add_connection<R: Rng + ?Sized>(
        &mut self,
        history: &mut InnovationTracker,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> Result<&ConnectionGene, SkipReason> {
        let sources: Vec<NodeGene> = self.nodes.values().copied().collect();
        let targets: Vec<NodeGene> = sources
            .iter()
            .filter(|n| !n.role().is_sensor())
            .copied()
            .collect();

        for _ in 0..config.max_connection_addition_attempts {
            let (source, target) = match (sources.choose(rng), targets.choose(rng)) {
                (Some(source), Some(target)) => (*source, *target),
                _ => break,
            };
            if let Some((input, output)) = self.orient(source, target, config.allow_recurrent) {
                let id = history.next_connection_innovation(input, output);
                let weight = ConnectionGene::random_weight(config, rng);
                let connection = ConnectionGene::new(id, input, output, weight);
                return self.add_connection(connection, config.allow_recurrent);
            }
        }

        Err(SkipReason::NoConnectablePair)
    }

    /// Returns the (input, output) pair a new connection
    /// between two nodes would have, or `None` if they
    /// cannot be connected.
    fn orient(
        &self,
        first: NodeGene,
        second: NodeGene,
        allow_recurrent: bool,
    ) -> Option<(Innovation, Innovation)> {
        let (input, output) = if allow_recurrent {
            (first, second)
        } else if first.x() < second.x() {
            (first, second)
        } else if second.x() < first.x() {
            (second, first)
        } else {
            return None;
        };

        let legal = !output.role().is_sensor()
            && (allow_recurrent || input.id() != output.id())
            && !self.has_connection_between(input.id(), output.id());
        legal.then(|| (input.id(), output.id()))
    }

    /// Induces an _add-node_ mutation in the genome.
    /// A random enabled connection is disabled and
    /// replaced by a new hidden node and two connections:
    /// one into the node with a weight of 1, and one out
    /// of it with the split connection's weight.
    /// Returns the markers used.
    ///
    /// # Errors
    /// Returns [`SkipReason::NoEnabledConnection`], leaving
    /// the genome unchanged, if there is nothing to split.
    ///
    /// # Examples
    /// ```
    /// use evoneat_nn::genomics::{GeneticConfig, InnovationTracker, NNGenome, NodeRole};
    ///
    /// let config = GeneticConfig {
    ///     initial_expression_chance: 1.0,
    ///     weight_bound: 5.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut rng = evoneat::rng::seeded(Some(0));
    /// let mut genome = NNGenome::new(&config, &mut rng);
    /// let split = genome.connection(0).unwrap().clone();
    ///
    /// let mut tracker = InnovationTracker::new(&config);
    /// let markers = genome.mutate_add_node(&mut tracker, &mut rng).unwrap();
    ///
    /// assert_eq!(genome.node(markers.node).unwrap().role(), NodeRole::Hidden);
    /// assert_eq!(genome.connection(markers.incoming).unwrap().weight(), 1.0);
    /// assert_eq!(genome.connection(markers.outgoing).unwrap().weight(), split.weight());
    ///
    /// // The split connection is disabled.
    /// assert!(!genome.connection(0).unwrap().enabled());
    /// ```
    pub fn mutate_add_node<R: Rng + ?Sized>(
        &mut self,
        history: &mut InnovationTracker,
        rng: &mut R,
    ) -> Result<SplitInnovation, SkipReason> {
        let split = self
            .connections
            .values()
            .filter(|c| c.enabled())
            .choose(rng)
            .cloned()
            .ok_or(SkipReason::NoEnabledConnection)?;

        let mut markers = history.next_split_innovation(&split);
        if self.already_holds(&markers) {
            markers = history.fresh_split_innovation(&split);
        }

        let (input, output) = split.endpoints();
        let (x, y) = match (self.nodes.get(&input), self.nodes.get(&output)) {
            (Some(input), Some(output)) => input.midpoint(output),
            _ => return Err(SkipReason::MissingEndpoint(input)),
        };

        if let Some(connection) = self.connections.get_mut(&split.innovation()) {
            connection.set_enabled(false);
        }
        self.nodes
            .insert(markers.node, NodeGene::new(markers.node, NodeRole::Hidden, x, y));
        self.connections.insert(
            markers.incoming,
            ConnectionGene::new(markers.incoming, input, markers.node, 1.0),
        );
        self.connections.insert(
            markers.outgoing,
            ConnectionGene::new(markers.outgoing, markers.node, output, split.weight()),
        );

        Ok(markers)
    }

    /// Whether any of the split's markers are
    /// already present in the genome.
    fn already_holds(&self, markers: &SplitInnovation) -> bool {
        self.nodes.contains_key(&markers.node)
            || self.connections.contains_key(&markers.incoming)
            || self.connections.contains_key(&markers.outgoing)
    }

    /// Flips the enabled flag of a random connection,
    /// returning its innovation number.
    ///
    /// # Errors
    /// Returns [`SkipReason::NoConnection`] if the
    /// genome has no connections.
    pub fn mutate_toggle_enable<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<Innovation, SkipReason> {
        let connection = self
            .connections
            .values_mut()
            .choose(rng)
            .ok_or(SkipReason::NoConnection)?;
        connection.toggle_enabled();
        Ok(connection.innovation())
    }

    /// Performs all mutations on the genome, each
    /// with its configured probability, and reports
    /// what the structural ones did.
    pub fn mutate_all<R: Rng + ?Sized>(
        &mut self,
        history: &mut InnovationTracker,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> MutationReport {
        let mut report = MutationReport::default();

        self.mutate_weights(config, rng);
        if rng.gen::<f32>() < config.node_addition_chance {
            report.added_node = Some(self.mutate_add_node(history, rng));
        }
        if rng.gen::<f32>() < config.connection_addition_chance {
            report.added_connection = Some(
                self.mutate_add_connection(history, config, rng)
                    .map(|c| c.innovation()),
            );
        }
        if rng.gen::<f32>() < config.toggle_enable_chance {
            report.toggled = Some(self.mutate_toggle_enable(rng));
        }

        for (mutation, reason) in report.skips() {
            debug!(mutation, %reason, "mutation skipped");
        }
        report
    }
}
