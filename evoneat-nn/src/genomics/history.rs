use crate::genomics::{ConnectionGene, Gene, GeneticConfig};
use crate::Innovation;

use ahash::RandomState;
use evoneat::InnovationHistory;

use std::collections::HashMap;

/// Markers handed out for the split of a connection:
/// the new hidden node and the two connections
/// replacing the split one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitInnovation {
    pub incoming: Innovation,
    pub node: Innovation,
    pub outgoing: Innovation,
}

/// Authority over the historical markers of a population.
///
/// Node ids and connection innovation numbers come from two
/// separate counters which only ever increase. Structural
/// mutations repeated within a generation (the same node pair
/// connected, or the same connection split) are answered from
/// a cache, so they share their markers; the cache is cleared
/// once per generation by the population.
///
/// Sensor nodes, output nodes, and the connections between
/// them have markers reserved from creation, derived from
/// their positions, which every genome agrees on.
///
/// Allocation takes `&mut self`, so concurrent mutators
/// must share a tracker behind a lock.
#[derive(Debug, Clone)]
pub struct InnovationTracker {
    sensor_count: usize,
    output_count: usize,
    next_connection_innovation: Innovation,
    next_node_innovation: Innovation,
    connection_innovations: HashMap<(Innovation, Innovation), Innovation, RandomState>,
    split_innovations: HashMap<Innovation, SplitInnovation, RandomState>,
}

impl InnovationHistory for InnovationTracker {
    type Config = GeneticConfig;

    fn new(config: &GeneticConfig) -> InnovationTracker {
        Self::new(config)
    }

    fn reset_generation_cache(&mut self) {
        self.connection_innovations.clear();
        self.split_innovations.clear();
    }
}

impl InnovationTracker {
    /// Creates a new tracker, reserving markers for the
    /// sensor and output nodes, and for every possible
    /// sensor-output connection.
    ///
    /// # Examples
    /// ```
    /// use evoneat_nn::genomics::{GeneticConfig, InnovationTracker};
    /// use std::num::NonZeroUsize;
    ///
    /// let tracker = InnovationTracker::new(&GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     ..GeneticConfig::zero()
    /// });
    ///
    /// assert_eq!(tracker.max_node_innovation(), 4);
    /// assert_eq!(tracker.max_connection_innovation(), 5);
    /// ```
    pub fn new(config: &GeneticConfig) -> InnovationTracker {
        let sensor_count = config.sensor_count();
        let output_count = config.output_count.get();
        InnovationTracker {
            sensor_count,
            output_count,
            next_connection_innovation: sensor_count * output_count,
            next_node_innovation: sensor_count + output_count,
            connection_innovations: HashMap::default(),
            split_innovations: HashMap::default(),
        }
    }

    /// Returns the reserved innovation number of a
    /// sensor-output connection.
    pub(crate) fn initial_connection_innovation(
        &self,
        source: Innovation,
        target: Innovation,
    ) -> Option<Innovation> {
        let outputs = self.sensor_count..self.sensor_count + self.output_count;
        if source < self.sensor_count && outputs.contains(&target) {
            Some(target - self.sensor_count + source * self.output_count)
        } else {
            None
        }
    }

    /// Returns the innovation number of a connection from `source`
    /// to `target`: the reserved one for sensor-output connections,
    /// the cached one if the pair was already connected in this
    /// generation, or a newly allocated one.
    ///
    /// # Examples
    /// ```
    /// use evoneat::InnovationHistory;
    /// use evoneat_nn::genomics::{GeneticConfig, InnovationTracker};
    ///
    /// let mut tracker = InnovationTracker::new(&GeneticConfig::zero());
    ///
    /// let first = tracker.next_connection_innovation(1, 5);
    /// assert_eq!(tracker.next_connection_innovation(1, 5), first);
    ///
    /// tracker.reset_generation_cache();
    /// assert!(tracker.next_connection_innovation(1, 5) > first);
    /// ```
    pub fn next_connection_innovation(&mut self, source: Innovation, target: Innovation) -> Innovation {
        if let Some(innovation) = self.initial_connection_innovation(source, target) {
            return innovation;
        }
        let next = &mut self.next_connection_innovation;
        *self
            .connection_innovations
            .entry((source, target))
            .or_insert_with(|| {
                *next += 1;
                *next - 1
            })
    }

    /// Returns the markers for splitting `split`, reusing
    /// those handed out for the same connection earlier
    /// in the generation.
    pub fn next_split_innovation(&mut self, split: &ConnectionGene) -> SplitInnovation {
        match self.split_innovations.get(&split.innovation()) {
            Some(&record) => record,
            None => self.fresh_split_innovation(split),
        }
    }

    /// Allocates brand new markers for splitting `split`,
    /// regardless of the cache. Used when a genome already
    /// contains the cached node (i.e. it split the same
    /// connection before).
    pub fn fresh_split_innovation(&mut self, split: &ConnectionGene) -> SplitInnovation {
        let node = self.next_node_innovation;
        self.next_node_innovation += 1;
        let record = SplitInnovation {
            incoming: self.next_connection_innovation(split.input(), node),
            node,
            outgoing: self.next_connection_innovation(node, split.output()),
        };
        self.split_innovations.insert(split.innovation(), record);
        record
    }

    /// Advances the counters past the specified markers,
    /// so they are never handed out again.
    pub fn reserve_past(&mut self, node: Innovation, connection: Innovation) {
        self.next_node_innovation = self.next_node_innovation.max(node + 1);
        self.next_connection_innovation = self.next_connection_innovation.max(connection + 1);
    }

    /// Returns the highest connection innovation
    /// number reserved or handed out so far.
    pub fn max_connection_innovation(&self) -> Innovation {
        self.next_connection_innovation.saturating_sub(1)
    }

    /// Returns the highest node id reserved
    /// or handed out so far.
    pub fn max_node_innovation(&self) -> Innovation {
        self.next_node_innovation.saturating_sub(1)
    }

    /// Returns the connections made during
    /// the current generation.
    pub fn connection_innovation_history(
        &self,
    ) -> impl Iterator<Item = (&(Innovation, Innovation), &Innovation)> {
        self.connection_innovations.iter()
    }

    /// Returns the splits made during the current generation.
    pub fn split_innovation_history(&self) -> impl Iterator<Item = (&Innovation, &SplitInnovation)> {
        self.split_innovations.iter()
    }
}
