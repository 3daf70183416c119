//! Error types for driftmesh
//!
//! API misuse surfaces immediately to the caller through these enums. Routing
//! inability is never an error; it shows up as hold and drop events instead.

use thiserror::Error;

use crate::identity::PeerId;

/// Configuration rejected at construction time
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { field: &'static str, value: f64 },
}

/// Errors from crypto accounting operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountingError {
    #[error("peer {0} is not a member of the mesh")]
    UnknownPeer(PeerId),
}

/// Top-level error type for driver-facing engine operations
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("peer {0} is not a member of the mesh")]
    NotAMember(PeerId),

    #[error("cannot send a message from {0} to itself")]
    InvalidSend(PeerId),

    #[error("accounting error: {0}")]
    Accounting(#[from] AccountingError),
}
