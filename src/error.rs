use thiserror::Error;

/// Invalid input handed to the distance metric, the classifier or the evaluator.
///
/// Always raised before any distance is computed, so a failing call never
/// leaves partial results behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("vector length mismatch: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("count mismatch between parallel sequences: {left} vs {right}")]
    CountMismatch { left: usize, right: usize },

    #[error("reference set is empty")]
    EmptyReferenceSet,

    #[error("k = {k} exceeds the reference set size {available}")]
    KTooLarge { k: usize, available: usize },

    #[error("k must be at least 1")]
    ZeroK,

    #[error("Minkowski order p must be at least 1")]
    ZeroOrder,
}

pub type Result<T> = std::result::Result<T, InputError>;
