use super::NodeRole;
use crate::Innovation;

use thiserror::Error;

/// Why a gene insertion or mutation left
/// the genome unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("duplicate gene insertion with innovation {0}")]
    DuplicateInnovation(Innovation),
    #[error("duplicate node insertion with id {0}")]
    DuplicateNode(Innovation),
    #[error("a connection {0} -> {1} already exists")]
    DuplicateEndpoints(Innovation, Innovation),
    #[error("connection endpoint {0} does not exist")]
    MissingEndpoint(Innovation),
    #[error("self-loop on node {0} while recurrence is disallowed")]
    SelfLoop(Innovation),
    #[error("connection targets sensor node {0}")]
    SensorTarget(Innovation),
    #[error("genome has no connections")]
    NoConnection,
    #[error("genome has no enabled connections to split")]
    NoEnabledConnection,
    #[error("no connectable node pair found")]
    NoConnectablePair,
}

/// A rejected genome document. Importing a
/// document either succeeds fully or fails
/// with one of these, never yielding a
/// partial genome.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    #[error("node id {0} appears more than once")]
    DuplicateNode(Innovation),
    #[error("connection innovation {0} appears more than once")]
    DuplicateInnovation(Innovation),
    #[error("connection {innovation} references missing node {node}")]
    DanglingEndpoint {
        innovation: Innovation,
        node: Innovation,
    },
    #[error("connections {0} and {1} share the same endpoints")]
    DuplicateEndpoints(Innovation, Innovation),
    #[error("connection {innovation} targets {role:?} node {node}")]
    SensorTarget {
        innovation: Innovation,
        node: Innovation,
        role: NodeRole,
    },
    #[error("connection {0} has a non-finite weight")]
    NonFiniteWeight(Innovation),
    #[error("genome has no input nodes")]
    MissingInputs,
    #[error("genome has no output nodes")]
    MissingOutputs,
}
