use thiserror::Error;

/// Failures building or activating a network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("expected {expected} inputs, found {found}")]
    InputArity { expected: usize, found: usize },
    #[error("malformed topology: genome has no output nodes")]
    NoOutputs,
}
