use super::Gene;
use crate::Innovation;

use serde::{Deserialize, Serialize};

use std::fmt;
use std::hash::{Hash, Hasher};

/// Horizontal layout coordinate of sensor nodes.
pub const SENSOR_X: f32 = 0.1;
/// Horizontal layout coordinate of output nodes.
pub const OUTPUT_X: f32 = 0.9;

/// The function a node serves in the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    /// Takes its value from the input vector.
    Input,
    /// Always outputs the configured bias value.
    Bias,
    Hidden,
    /// Its value is reported in the output vector.
    Output,
}

impl NodeRole {
    /// Returns whether nodes of this role
    /// get their value from outside the network,
    /// and thus cannot be connection targets.
    pub fn is_sensor(self) -> bool {
        matches!(self, NodeRole::Input | NodeRole::Bias)
    }
}

/// A node of a genome. Nodes are identified solely
/// by their id: two nodes with the same id are equal
/// regardless of role or position.
///
/// The (x, y) coordinates are a layout hint. The x
/// coordinate also orients connections in genomes
/// which disallow recurrence.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct NodeGene {
    id: Innovation,
    role: NodeRole,
    x: f32,
    y: f32,
}

impl NodeGene {
    /// Returns a new node with the specified parameters.
    ///
    /// # Examples
    /// ```
    /// use evoneat_nn::genomics::{NodeGene, NodeRole};
    ///
    /// let node = NodeGene::new(7, NodeRole::Hidden, 0.5, 0.25);
    ///
    /// assert_eq!(node.id(), 7);
    /// assert_eq!(node, NodeGene::new(7, NodeRole::Output, 0.9, 0.0));
    /// ```
    pub fn new(id: Innovation, role: NodeRole, x: f32, y: f32) -> NodeGene {
        NodeGene { id, role, x, y }
    }

    pub fn id(&self) -> Innovation {
        self.id
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    /// Returns the point halfway between two nodes.
    pub(super) fn midpoint(&self, other: &NodeGene) -> (f32, f32) {
        ((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

impl Gene for NodeGene {
    fn innovation(&self) -> Innovation {
        self.id
    }
}

impl PartialEq for NodeGene {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NodeGene {}

impl Hash for NodeGene {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for NodeGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{:?} @ ({:.2}, {:.2})]", self.id, self.role, self.x, self.y)
    }
}
