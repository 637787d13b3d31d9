use thiserror::Error;

#[derive(Error, Debug)]
pub enum LiasseError {
    #[error("Invalid coherence tolerance {0}: must be a finite, non-negative amount")]
    InvalidTolerance(f64),

    #[error("Invalid mapping in {table} table at line {reference}: {details}")]
    InvalidMapping {
        table: String,
        reference: String,
        details: String,
    },

    #[error("Coherence violation on {code}: {left} != {right} (gap {gap})")]
    CoherenceViolation {
        code: String,
        left: f64,
        right: f64,
        gap: f64,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LiasseError>;
