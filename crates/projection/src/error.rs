//! Error types for projection setup.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("Unknown IGN Lambert zone code: {0}")]
    UnknownIgnZone(i64),
}
