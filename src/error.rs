//! Error taxonomy shared by every engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// A plate, planet, platelet or simulation could not be found.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Input that cannot describe a real entity (zero radius, origin position, ...).
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// A neighbor reference with no backing record.
    #[error("graph inconsistency: {0}")]
    GraphInconsistency(String),

    /// A write or delete was rejected by the backing store.
    #[error("storage failure: {0}")]
    Storage(String),

    #[error("rocksdb error: {0}")]
    Rocks(#[from] rocksdb::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl SimError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        SimError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SimError::NotFound { .. })
    }
}

pub type SimResult<T> = Result<T, SimError>;
