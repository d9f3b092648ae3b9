use thiserror::Error;

/// Errors raised while driving a population
/// through its generational cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PopulationError {
    #[error("evolution attempted with {missing} unevaluated clients")]
    EvaluationIncomplete { missing: usize },
}
