use thiserror::Error;

use crate::core::sampling::SobolError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("Expected {expected} parameters, got {found}")]
    ParameterCount { expected: usize, found: usize },

    #[error("Failed to build the quasi-random point set: {source}")]
    Sampling {
        #[from]
        source: SobolError,
    },
}
