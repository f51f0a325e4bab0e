use crate::model::{CableMaterial, EntityKind, Id};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TopologyError>;

/// Reasons a topology operation is rejected. None of them are fatal; the
/// caller gets the error back and the store is left as it was.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// The edit would close a loop in the panel tree or the breaker feeding graph
    #[error("cycle detected: {0}")]
    Cycle(String),
    #[error("invalid topology: {0}")]
    InvalidTopology(String),
    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: Id },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("no {material} cable data for cross-section {cross_section} mm²")]
    UnknownCrossSection {
        material: CableMaterial,
        cross_section: f64,
    },
    #[error("invalid value: {0}")]
    Validation(String),
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TopologyError {
    pub fn not_found(kind: EntityKind, id: &Id) -> Self {
        TopologyError::NotFound {
            kind,
            id: id.clone(),
        }
    }
}
