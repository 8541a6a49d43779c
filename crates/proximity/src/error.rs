//! Proximity error types

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProximityError {
    /// Nearest-neighbour query against an index with no entries
    #[error("spatial index is empty")]
    EmptyIndex,
}
