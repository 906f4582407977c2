//! Error types for the mapping engine

use thiserror::Error;

use crate::entity::EntityKind;

/// Result type for port operations
pub type Result<T> = std::result::Result<T, PortError>;

/// Hard failures raised by the mapping engine.
///
/// Data that is merely incomplete never surfaces here; unresolved
/// relations and skipped sections are aggregated into the
/// [`ImportReport`](crate::import::ImportReport) instead.
#[derive(Error, Debug)]
pub enum PortError {
    #[error("No schema registered for {0:?}")]
    SchemaNotRegistered(EntityKind),

    #[error("Schema for {schema:?} references unregistered target {target:?}")]
    TargetNotRegistered {
        schema: EntityKind,
        target: EntityKind,
    },

    #[error("Object store error: {0}")]
    Store(String),

    #[error("Document root must be an object")]
    MalformedDocument,

    #[error("Unknown object handle")]
    UnknownObject,

    #[error("Document is {size} bytes; the code capacity is {capacity}")]
    CapacityExceeded { size: usize, capacity: usize },

    #[error("Could not decode code image: {0}")]
    DecodeFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
