//! graphport
//!
//! A schema-driven mapping engine between a persistent object graph of
//! game-data entities and a portable interchange document, plus a
//! capacity-bounded QR-code transport for sharing one exported object.
//!
//! ## Architecture
//!
//! - Each entity type is described by a declarative [`EntitySchema`]:
//!   document array key, typed attribute accessors, and relation
//!   descriptors (to-one, to-many, attributed many-to-many joins).
//! - The [`SchemaRegistry`] holds the schemas and is built bottom-up in
//!   dependency order, so every relation target is registered before its
//!   dependents.
//! - [`import::import_document`] merges a document into an existing graph:
//!   resolve-or-create by identifier, patch attributes, wire relations.
//!   The merge is idempotent and never destructive.
//! - [`export::export_object`] walks the schema outward from one object and
//!   rebuilds its document fragment.
//! - The [`transport`] module serializes a fragment to minimal text,
//!   enforces the code capacity ceiling, and stages the rendered artifact
//!   for sharing; rendering itself sits behind the [`CodeEngine`] trait.
//! - [`Porter`] is the facade that owns the registry and engine and commits
//!   once per import.
//!
//! Persistence is a collaborator: the engine runs against the
//! [`ObjectStore`] trait and holds no objects beyond a per-call cache.

pub mod entity;
pub mod error;
pub mod export;
pub mod import;
pub mod porter;
pub mod schema;
pub mod store;
pub mod transport;
pub mod value;

pub use entity::{Entity, EntityData, EntityKind, Identifier, JoinId, JoinKind, JoinRecord, ObjectId};
pub use error::{PortError, Result};
pub use import::{ImportCondition, ImportReport};
pub use porter::Porter;
pub use schema::{EntitySchema, SchemaRegistry};
pub use store::{MemoryStore, ObjectStore};
pub use transport::{CodeEngine, CodeImage, CodeOptions, ErrorCorrection, ShareArea, CODE_CAPACITY};
pub use value::Value;
