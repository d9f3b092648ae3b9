use crate::genomics::{ConnectionGene, GeneticConfig, NNGenome, NodeGene, NodeRole};
use crate::Innovation;

use rand::Rng;
use tracing::{debug, warn};

use std::collections::BTreeSet;

/// Which parent(s) carry a gene.
enum Carrier<'a> {
    Both(&'a ConnectionGene, &'a ConnectionGene),
    First(&'a ConnectionGene),
    Second(&'a ConnectionGene),
}

impl NNGenome {
    /// Mates two genomes, aligning their connections by
    /// innovation number.
    ///
    /// Matching connections are copied from a random parent,
    /// or with probability [`mate_by_averaging_chance`] get
    /// the average of both parents' weights. A matching
    /// connection disabled in either parent is enabled in the
    /// child only with probability [`reactivation_chance`].
    /// Disjoint and excess connections are inherited from the
    /// fitter parent only; if both are equally fit each one is
    /// inherited with probability 1/2.
    ///
    /// The child carries every input, bias and output node of
    /// both parents, and the endpoints of its connections.
    ///
    /// [`mate_by_averaging_chance`]: GeneticConfig::mate_by_averaging_chance
    /// [`reactivation_chance`]: GeneticConfig::reactivation_chance
    ///
    /// # Examples
    /// ```
    /// use evoneat_nn::genomics::{Gene, GeneticConfig, InnovationTracker, NNGenome};
    /// use std::collections::HashSet;
    ///
    /// let config = GeneticConfig {
    ///     initial_expression_chance: 1.0,
    ///     weight_bound: 5.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut rng = evoneat::rng::seeded(Some(0));
    /// let mut tracker = InnovationTracker::new(&config);
    ///
    /// let mut genome1 = NNGenome::new(&config, &mut rng);
    /// let mut genome2 = genome1.clone();
    /// genome1.mutate_add_node(&mut tracker, &mut rng).unwrap();
    /// genome2.mutate_add_node(&mut tracker, &mut rng).unwrap();
    /// genome2.mutate_add_node(&mut tracker, &mut rng).unwrap();
    ///
    /// let child = genome1.crossover(&genome2, 1.0, 2.0, &config, &mut rng);
    ///
    /// let ids = |g: &NNGenome| g.connections().map(|c| c.innovation()).collect::<HashSet<_>>();
    /// let parents: HashSet<_> = ids(&genome1).union(&ids(&genome2)).copied().collect();
    /// assert!(ids(&child).is_subset(&parents));
    /// ```
    pub fn crossover<R: Rng + ?Sized>(
        &self,
        other: &NNGenome,
        fitness: f32,
        other_fitness: f32,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> NNGenome {
        let mut child = NNGenome {
            nodes: self
                .nodes
                .iter()
                .chain(&other.nodes)
                .filter(|(_, n)| n.role() != NodeRole::Hidden)
                .map(|(id, n)| (*id, *n))
                .collect(),
            connections: Default::default(),
            fitness: 0.0,
        };

        let equally_fit = (fitness - other_fitness).abs() < f32::EPSILON;
        let first_fitter = !equally_fit && fitness > other_fitness;
        let averaging = rng.gen::<f32>() < config.mate_by_averaging_chance;

        let innovations: BTreeSet<Innovation> = self
            .connections
            .keys()
            .chain(other.connections.keys())
            .copied()
            .collect();

        for id in innovations {
            let carrier = match (self.connections.get(&id), other.connections.get(&id)) {
                (Some(a), Some(b)) => Carrier::Both(a, b),
                (Some(a), None) => Carrier::First(a),
                (None, Some(b)) => Carrier::Second(b),
                (None, None) => continue,
            };

            let inherited = match carrier {
                Carrier::Both(a, b) => Some(inherit_matching(a, b, averaging, config, rng)),
                Carrier::First(a) if first_fitter || (equally_fit && rng.gen_bool(0.5)) => {
                    Some(a.clone())
                }
                Carrier::Second(b) if !first_fitter && (!equally_fit || rng.gen_bool(0.5)) => {
                    Some(b.clone())
                }
                _ => None,
            };

            if let Some(connection) = inherited {
                child.inherit(connection, self, other);
            }
        }

        child
    }

    /// Adds an inherited connection and its endpoints to the
    /// child, skipping it if it duplicates an existing pair.
    fn inherit(&mut self, connection: ConnectionGene, first: &NNGenome, second: &NNGenome) {
        let (input, output) = connection.endpoints();
        if self.has_connection_between(input, output) {
            debug!(input, output, "crossover skipped a duplicate connection pair");
            return;
        }

        for id in [input, output] {
            if self.nodes.contains_key(&id) {
                continue;
            }
            let node = first
                .nodes
                .get(&id)
                .or_else(|| second.nodes.get(&id))
                .copied()
                .unwrap_or_else(|| {
                    warn!(node = id, "synthesizing pass-through node missing from both parents");
                    NodeGene::new(id, NodeRole::Hidden, 0.5, 0.5)
                });
            self.nodes.insert(id, node);
        }

        if let Err(reason) = self.add_connection(connection, true) {
            debug!(%reason, "crossover skipped a connection");
        }
    }
}

/// Returns the child's copy of a connection
/// carried by both parents.
fn inherit_matching<R: Rng + ?Sized>(
    first: &ConnectionGene,
    second: &ConnectionGene,
    averaging: bool,
    config: &GeneticConfig,
    rng: &mut R,
) -> ConnectionGene {
    let mut child = if rng.gen::<bool>() {
        first.clone()
    } else {
        second.clone()
    };
    if averaging {
        child.set_weight((first.weight() + second.weight()) / 2.0);
    }
    if !first.enabled() || !second.enabled() {
        child.set_enabled(rng.gen::<f32>() < config.reactivation_chance);
    }
    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{Gene, InnovationTracker};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;
    use std::num::NonZeroUsize;

    fn config() -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap(),
            output_count: NonZeroUsize::new(2).unwrap(),
            initial_expression_chance: 1.0,
            weight_bound: 5.0,
            ..GeneticConfig::zero()
        }
    }

    fn ids(genome: &NNGenome) -> HashSet<Innovation> {
        genome.connections().map(|c| c.innovation()).collect()
    }

    /// Two relatives, the second with more structure.
    fn parents(rng: &mut ChaCha8Rng) -> (NNGenome, NNGenome) {
        let config = config();
        let mut tracker = InnovationTracker::new(&config);
        let mut first = NNGenome::new(&config, rng);
        let mut second = first.clone();
        first.mutate_add_node(&mut tracker, rng).unwrap();
        for _ in 0..3 {
            second.mutate_add_node(&mut tracker, rng).unwrap();
        }
        (first, second)
    }

    #[test]
    fn fitter_parent_structure_only() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let (first, second) = parents(&mut rng);
        for _ in 0..20 {
            let child = first.crossover(&second, 0.5, 3.0, &config(), &mut rng);
            assert_eq!(ids(&child), ids(&second));
            let child = first.crossover(&second, 3.0, 0.5, &config(), &mut rng);
            assert_eq!(ids(&child), ids(&first));
        }
    }

    #[test]
    fn equal_fitness_child_is_subset_of_union() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let (first, second) = parents(&mut rng);
        let union: HashSet<_> = ids(&first).union(&ids(&second)).copied().collect();
        let common: HashSet<_> = ids(&first).intersection(&ids(&second)).copied().collect();
        for _ in 0..20 {
            let child = first.crossover(&second, 1.0, 1.0, &config(), &mut rng);
            assert!(ids(&child).is_subset(&union));
            assert!(common.is_subset(&ids(&child)));
        }
    }

    #[test]
    fn child_keeps_io_nodes_and_endpoints() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let (first, second) = parents(&mut rng);
        let child = first.crossover(&second, 0.0, 1.0, &config(), &mut rng);
        assert_eq!(child.node_ids(NodeRole::Input).count(), 2);
        assert_eq!(child.node_ids(NodeRole::Output).count(), 2);
        for connection in child.connections() {
            assert!(child.node(connection.input()).is_some());
            assert!(child.node(connection.output()).is_some());
        }
        assert_eq!(child.fitness(), 0.0);
    }

    #[test]
    fn disabled_genes_reactivate_by_chance() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut first = NNGenome::new(&config(), &mut rng);
        first.connections.get_mut(&0).unwrap().set_enabled(false);
        let second = first.clone();

        let never = GeneticConfig {
            reactivation_chance: 0.0,
            ..config()
        };
        let child = first.crossover(&second, 1.0, 1.0, &never, &mut rng);
        assert!(!child.connection(0).unwrap().enabled());

        let always = GeneticConfig {
            reactivation_chance: 1.0,
            ..config()
        };
        let child = first.crossover(&second, 1.0, 1.0, &always, &mut rng);
        assert!(child.connection(0).unwrap().enabled());
    }

    #[test]
    fn averaging_matched_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let first = NNGenome::new(&config(), &mut rng);
        let mut second = first.clone();
        for connection in second.connections.values_mut() {
            connection.set_weight(connection.weight() + 1.0);
        }
        let config = GeneticConfig {
            mate_by_averaging_chance: 1.0,
            ..config()
        };
        let child = first.crossover(&second, 1.0, 1.0, &config, &mut rng);
        for (c, f) in child.connections().zip(first.connections()) {
            assert!((c.weight() - (f.weight() + 0.5)).abs() < 1e-5);
        }
    }

    #[test]
    fn missing_endpoint_is_synthesized() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut first = NNGenome::new(&config(), &mut rng);
        first
            .connections
            .insert(50, ConnectionGene::new(50, 0, 9, 1.0));
        let second = NNGenome::new(&config(), &mut rng);

        let child = first.crossover(&second, 2.0, 1.0, &config(), &mut rng);
        let node = child.node(9).unwrap();
        assert_eq!(node.role(), NodeRole::Hidden);
        assert!(child.connection(50).is_some());
    }
}
