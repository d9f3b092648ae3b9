use crate::genomics::{
    ConnectionGene, Gene, NNGenome, NodeGene, NodeRole, SnapshotError, OUTPUT_X, SENSOR_X,
};
use crate::Innovation;

use serde::{Deserialize, Serialize};

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::convert::TryFrom;

/// A node as stored in a genome document.
/// Layout coordinates are optional; missing
/// ones are filled in from the node's role.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: Innovation,
    pub role: NodeRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
}

/// A connection as stored in a genome document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub innovation: Innovation,
    pub source: Innovation,
    pub target: Innovation,
    pub weight: f32,
    pub enabled: bool,
}

/// The persisted form of a genome: its nodes and
/// its connections, each ordered by id.
///
/// # Examples
/// ```
/// use evoneat_nn::genomics::{GeneticConfig, GenomeSnapshot, NNGenome};
///
/// let config = GeneticConfig {
///     initial_expression_chance: 1.0,
///     weight_bound: 1.0,
///     ..GeneticConfig::zero()
/// };
/// let mut rng = evoneat::rng::seeded(Some(0));
/// let genome = NNGenome::new(&config, &mut rng);
///
/// let snapshot = genome.snapshot();
/// assert_eq!(snapshot.nodes.len(), 2);
/// assert_eq!(snapshot.connections.len(), 1);
///
/// assert_eq!(NNGenome::from_snapshot(snapshot).unwrap(), genome);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenomeSnapshot {
    pub nodes: Vec<NodeRecord>,
    pub connections: Vec<ConnectionRecord>,
}

impl NNGenome {
    /// Exports the genome's structure.
    pub fn snapshot(&self) -> GenomeSnapshot {
        GenomeSnapshot::from(self)
    }

    /// Rebuilds a genome from an exported structure.
    /// The fitness of the result is 0.
    ///
    /// # Errors
    /// Returns an error if the document is malformed.
    /// No genome is built in that case.
    pub fn from_snapshot(snapshot: GenomeSnapshot) -> Result<NNGenome, SnapshotError> {
        NNGenome::try_from(snapshot)
    }
}

impl From<&NNGenome> for GenomeSnapshot {
    fn from(genome: &NNGenome) -> GenomeSnapshot {
        GenomeSnapshot {
            nodes: genome
                .nodes()
                .map(|n| NodeRecord {
                    id: n.id(),
                    role: n.role(),
                    x: Some(n.x()),
                    y: Some(n.y()),
                })
                .collect(),
            connections: genome
                .connections()
                .map(|c| ConnectionRecord {
                    innovation: c.innovation(),
                    source: c.input(),
                    target: c.output(),
                    weight: c.weight(),
                    enabled: c.enabled(),
                })
                .collect(),
        }
    }
}

impl From<NNGenome> for GenomeSnapshot {
    fn from(genome: NNGenome) -> GenomeSnapshot {
        GenomeSnapshot::from(&genome)
    }
}

impl TryFrom<GenomeSnapshot> for NNGenome {
    type Error = SnapshotError;

    fn try_from(snapshot: GenomeSnapshot) -> Result<NNGenome, SnapshotError> {
        let mut nodes = BTreeMap::new();
        for record in snapshot.nodes {
            let x = record.x.unwrap_or(match record.role {
                NodeRole::Input | NodeRole::Bias => SENSOR_X,
                NodeRole::Output => OUTPUT_X,
                NodeRole::Hidden => 0.5,
            });
            let node = NodeGene::new(record.id, record.role, x, record.y.unwrap_or(0.5));
            match nodes.entry(record.id) {
                Entry::Occupied(_) => return Err(SnapshotError::DuplicateNode(record.id)),
                Entry::Vacant(entry) => {
                    entry.insert(node);
                }
            }
        }

        if !nodes.values().any(|n: &NodeGene| n.role() == NodeRole::Input) {
            return Err(SnapshotError::MissingInputs);
        }
        if !nodes.values().any(|n: &NodeGene| n.role() == NodeRole::Output) {
            return Err(SnapshotError::MissingOutputs);
        }

        let mut connections = BTreeMap::new();
        let mut pairs = HashMap::new();
        for record in snapshot.connections {
            let innovation = record.innovation;
            for node in [record.source, record.target] {
                if !nodes.contains_key(&node) {
                    return Err(SnapshotError::DanglingEndpoint { innovation, node });
                }
            }
            let target_role = nodes[&record.target].role();
            if target_role.is_sensor() {
                return Err(SnapshotError::SensorTarget {
                    innovation,
                    node: record.target,
                    role: target_role,
                });
            }
            if !record.weight.is_finite() {
                return Err(SnapshotError::NonFiniteWeight(innovation));
            }
            if let Some(previous) = pairs.insert((record.source, record.target), innovation) {
                return Err(SnapshotError::DuplicateEndpoints(previous, innovation));
            }

            let mut connection =
                ConnectionGene::new(innovation, record.source, record.target, record.weight);
            connection.set_enabled(record.enabled);
            match connections.entry(innovation) {
                Entry::Occupied(_) => return Err(SnapshotError::DuplicateInnovation(innovation)),
                Entry::Vacant(entry) => {
                    entry.insert(connection);
                }
            }
        }

        Ok(NNGenome {
            nodes,
            connections,
            fitness: 0.0,
        })
    }
}
