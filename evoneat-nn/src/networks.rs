//! A network is the executable form of a genome,
//! with disabled connections being ignored. Node genes
//! become network nodes, and enabled connection genes
//! become weighted links between them.
//!
//! Networks whose links form no cycle are evaluated in
//! a single pass in topological order. Recurrent networks
//! are instead _relaxed_ for a number of ticks, each node
//! computing its new value from the previous tick's values.
mod activation;
mod connection;
mod errors;

pub use activation::ActivationType;
pub use errors::NetworkError;

use crate::genomics::{GeneticConfig, NNGenome, NodeRole};
use crate::Innovation;
use connection::Connection;

use ahash::RandomState;
use evoneat::Phenotype;

use std::collections::{HashMap, VecDeque};
use std::fmt;

/// How the network's values are computed.
#[derive(Clone, Debug, PartialEq)]
enum Schedule {
    /// Single pass over the non-sensor
    /// nodes in topological order.
    Acyclic(Box<[usize]>),
    /// Repeated synchronous updates.
    Relaxation { ticks: usize },
}

/// An arbitrarily-structured neural network, built
/// from the enabled part of a genome.
///
/// Nodes are laid out as inputs, bias, outputs and
/// hidden nodes, each group sorted by id.
#[derive(Clone, Debug)]
pub struct Calculator {
    input_count: usize,
    sensor_count: usize,
    output_count: usize,
    bias_value: f32,
    activation: ActivationType,
    node_ids: Box<[Innovation]>,
    incoming: Box<[Box<[Connection]>]>,
    schedule: Schedule,
    values: Box<[f32]>,
    previous: Box<[f32]>,
}

impl Calculator {
    /// Generates a new network from the passed genome.
    ///
    /// # Errors
    /// Returns [`NetworkError::NoOutputs`] if the genome
    /// has no output nodes.
    ///
    /// # Examples
    /// ```
    /// use evoneat_nn::genomics::{GeneticConfig, NNGenome};
    /// use evoneat_nn::networks::Calculator;
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_expression_chance: 1.0,
    ///     weight_bound: 5.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut rng = evoneat::rng::seeded(Some(0));
    /// let genome = NNGenome::new(&config, &mut rng);
    ///
    /// let network = Calculator::new(&genome, &config).unwrap();
    /// assert!(!network.is_recurrent());
    /// ```
    pub fn new(genome: &NNGenome, config: &GeneticConfig) -> Result<Calculator, NetworkError> {
        let inputs: Vec<Innovation> = genome.node_ids(NodeRole::Input).collect();
        let bias: Vec<Innovation> = genome.node_ids(NodeRole::Bias).collect();
        let outputs: Vec<Innovation> = genome.node_ids(NodeRole::Output).collect();
        let hidden: Vec<Innovation> = genome.node_ids(NodeRole::Hidden).collect();
        if outputs.is_empty() {
            return Err(NetworkError::NoOutputs);
        }

        let node_ids: Box<[Innovation]> = inputs
            .iter()
            .chain(&bias)
            .chain(&outputs)
            .chain(&hidden)
            .copied()
            .collect();
        let node_count = node_ids.len();
        let sensor_count = inputs.len() + bias.len();

        let node_index_from_id: HashMap<_, _, RandomState> = node_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();

        let mut incoming = vec![vec![]; node_count];
        let mut outgoing = vec![vec![]; node_count];
        for connection in genome.connections().filter(|c| c.enabled()) {
            let input = node_index_from_id.get(&connection.input());
            let output = node_index_from_id.get(&connection.output());
            if let (Some(&input), Some(&output)) = (input, output) {
                if output >= sensor_count {
                    incoming[output].push(Connection::new(input, connection.weight()));
                    outgoing[input].push(output);
                }
            }
        }

        let schedule = match topological_order(&incoming, &outgoing, sensor_count) {
            Some(order) => Schedule::Acyclic(order),
            None => Schedule::Relaxation {
                ticks: match config.relaxation_ticks {
                    0 => depth_estimate(&outgoing),
                    ticks => ticks,
                },
            },
        };

        Ok(Calculator {
            input_count: inputs.len(),
            sensor_count,
            output_count: outputs.len(),
            bias_value: config.bias_value,
            activation: config.activation,
            node_ids,
            incoming: incoming.into_iter().map(|v| v.into()).collect(),
            schedule,
            values: vec![0.0; node_count].into(),
            previous: vec![0.0; node_count].into(),
        })
    }

    /// Computes the network's outputs for the
    /// passed inputs. Calls are independent of
    /// each other: no state carries over.
    ///
    /// # Errors
    /// Returns [`NetworkError::InputArity`] if the number
    /// of inputs is not the network's input count.
    ///
    /// # Examples
    /// ```
    /// use evoneat_nn::genomics::{ConnectionGene, GeneticConfig, NNGenome};
    /// use evoneat_nn::networks::{ActivationType, Calculator};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     activation: ActivationType::ReLU,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut rng = evoneat::rng::seeded(Some(0));
    /// let mut genome = NNGenome::new(&config, &mut rng);
    /// genome.add_connection(ConnectionGene::new(0, 0, 2, 2.5), false).unwrap();
    /// genome.add_connection(ConnectionGene::new(1, 1, 2, -2.5), false).unwrap();
    ///
    /// let mut network = Calculator::new(&genome, &config).unwrap();
    ///
    /// assert_eq!(network.calculate(&[1.0, 0.5]).unwrap(), vec![1.25]);
    /// assert_eq!(network.calculate(&[0.5, 1.0]).unwrap(), vec![0.0]);
    /// assert!(network.calculate(&[0.5]).is_err());
    /// ```
    pub fn calculate(&mut self, inputs: &[f32]) -> Result<Vec<f32>, NetworkError> {
        if inputs.len() != self.input_count {
            return Err(NetworkError::InputArity {
                expected: self.input_count,
                found: inputs.len(),
            });
        }

        self.clear_state();
        self.set_sensors(inputs);

        match &self.schedule {
            Schedule::Acyclic(order) => {
                for &node in order.iter() {
                    let sum = input_sum(&self.incoming[node], &self.values);
                    self.values[node] = self.activation.apply(sum);
                }
            }
            Schedule::Relaxation { ticks } => {
                for _ in 0..*ticks {
                    self.previous.copy_from_slice(&self.values);
                    for node in self.sensor_count..self.values.len() {
                        let sum = input_sum(&self.incoming[node], &self.previous);
                        self.values[node] = self.activation.apply(sum);
                    }
                }
            }
        }

        Ok(self.outputs())
    }

    /// Clears the values of all nodes.
    fn clear_state(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
        self.previous.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Sets the value of each input node to the corresponding
    /// value in the passed slice, and of the bias node to the
    /// bias value.
    fn set_sensors(&mut self, inputs: &[f32]) {
        self.values[..self.input_count].copy_from_slice(inputs);
        for bias in &mut self.values[self.input_count..self.sensor_count] {
            *bias = self.bias_value;
        }
    }

    fn outputs(&self) -> Vec<f32> {
        self.values[self.sensor_count..self.sensor_count + self.output_count].to_vec()
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Returns the genome id of each network node.
    pub fn node_ids(&self) -> &[Innovation] {
        &self.node_ids
    }

    /// Returns whether the network contains cycles,
    /// and so is evaluated by relaxation.
    pub fn is_recurrent(&self) -> bool {
        matches!(self.schedule, Schedule::Relaxation { .. })
    }

    /// Returns the number of relaxation ticks run per
    /// calculation, or `None` for acyclic networks.
    pub fn ticks(&self) -> Option<usize> {
        match self.schedule {
            Schedule::Acyclic(_) => None,
            Schedule::Relaxation { ticks } => Some(ticks),
        }
    }
}

impl Phenotype for Calculator {
    type Error = NetworkError;

    fn activate(&mut self, inputs: &[f32]) -> Result<Vec<f32>, NetworkError> {
        self.calculate(inputs)
    }
}

impl fmt::Display for Calculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self as &dyn fmt::Debug).fmt(f)
    }
}

fn input_sum(incoming: &[Connection], values: &[f32]) -> f32 {
    incoming.iter().map(|c| c.weight * values[c.input]).sum()
}

/// Returns the non-sensor nodes in an order where every
/// node comes after its inputs, or `None` if the links
/// form a cycle.
fn topological_order(
    incoming: &[Vec<Connection>],
    outgoing: &[Vec<usize>],
    sensor_count: usize,
) -> Option<Box<[usize]>> {
    let mut pending: Vec<usize> = incoming.iter().map(Vec::len).collect();
    let mut ready: VecDeque<usize> = (0..incoming.len()).filter(|&n| pending[n] == 0).collect();
    let mut order = Vec::with_capacity(incoming.len() - sensor_count);
    let mut visited = 0;

    while let Some(node) = ready.pop_front() {
        visited += 1;
        if node >= sensor_count {
            order.push(node);
        }
        for &next in &outgoing[node] {
            pending[next] -= 1;
            if pending[next] == 0 {
                ready.push_back(next);
            }
        }
    }

    (visited == incoming.len()).then(|| order.into())
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

/// Estimates the number of ticks a signal needs to cross
/// a recurrent network: the longest path through it once
/// the links closing cycles are dropped. At least 1.
fn depth_estimate(outgoing: &[Vec<usize>]) -> usize {
    fn visit(
        node: usize,
        outgoing: &[Vec<usize>],
        state: &mut [Visit],
        forward: &mut [Vec<usize>],
        postorder: &mut Vec<usize>,
    ) {
        state[node] = Visit::InProgress;
        for &next in &outgoing[node] {
            match state[next] {
                // Closes a cycle.
                Visit::InProgress => {}
                Visit::Done => forward[node].push(next),
                Visit::Unvisited => {
                    forward[node].push(next);
                    visit(next, outgoing, state, forward, postorder);
                }
            }
        }
        state[node] = Visit::Done;
        postorder.push(node);
    }

    let node_count = outgoing.len();
    let mut state = vec![Visit::Unvisited; node_count];
    let mut forward = vec![vec![]; node_count];
    let mut postorder = Vec::with_capacity(node_count);
    // Sensors come first, so paths are rooted at them where possible.
    for root in 0..node_count {
        if state[root] == Visit::Unvisited {
            visit(root, outgoing, &mut state, &mut forward, &mut postorder);
        }
    }

    let mut depth = vec![0; node_count];
    for &node in postorder.iter().rev() {
        for &next in &forward[node] {
            depth[next] = depth[next].max(depth[node] + 1);
        }
    }
    depth.into_iter().max().unwrap_or(0).max(1)
}
