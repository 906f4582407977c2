//! Document export
//!
//! Walks outward from a graph object along its schema, producing a document
//! fragment: scalar attributes verbatim, to-one and to-many relations as
//! identifier references, join relations as arrays carrying the join
//! attributes. Relations that resolve to nothing contribute no key, keeping
//! documents compact for the code transport.

use std::collections::HashSet;

use serde_json::{Map, Value as Json};

use crate::entity::{EntityKind, ObjectId};
use crate::error::{PortError, Result};
use crate::schema::SchemaRegistry;
use crate::store::ObjectStore;

/// Build the document fragment for one object.
pub fn export_object<S: ObjectStore>(
    registry: &SchemaRegistry,
    store: &S,
    object: ObjectId,
) -> Result<Json> {
    let mut visited = HashSet::new();
    fragment(registry, store, object, &mut visited)
}

/// Reassemble a whole interchange document: every object of every
/// registered type, in dependency order. Types with no objects contribute
/// no key.
pub fn export_document<S: ObjectStore>(registry: &SchemaRegistry, store: &S) -> Result<Json> {
    let mut root = Map::new();
    for kind in EntityKind::DEPENDENCY_ORDER {
        let Some(schema) = registry.get(kind) else {
            continue;
        };
        let objects = store.fetch_all(kind)?;
        if objects.is_empty() {
            continue;
        }
        let mut records = Vec::with_capacity(objects.len());
        for object in objects {
            records.push(export_object(registry, store, object)?);
        }
        root.insert(schema.array_key.to_string(), Json::Array(records));
    }
    Ok(Json::Object(root))
}

/// One object's fragment. `visited` tracks the current traversal so an
/// inline to-one relation cannot re-descend into an object already being
/// emitted; a cycle degrades to an identifier reference.
fn fragment<S: ObjectStore>(
    registry: &SchemaRegistry,
    store: &S,
    object: ObjectId,
    visited: &mut HashSet<ObjectId>,
) -> Result<Json> {
    let entity = store.entity(object)?;
    let kind = entity.kind();
    let schema = registry
        .get(kind)
        .ok_or(PortError::SchemaNotRegistered(kind))?;
    visited.insert(object);

    let mut record = Map::new();
    record.insert("id".to_string(), Json::String(entity.id_string()));

    for attr in &schema.attributes {
        if let Some(value) = (attr.get)(entity) {
            record.insert(attr.key.to_string(), value.to_json());
        }
    }

    for rel in &schema.to_one {
        let Some(target) = (rel.get)(entity) else {
            continue;
        };
        let value = if rel.inline && !visited.contains(&target) {
            fragment(registry, store, target, visited)?
        } else {
            Json::String(store.entity(target)?.id_string())
        };
        record.insert(rel.key.to_string(), value);
    }

    for rel in &schema.to_many {
        let targets = (rel.get)(entity);
        if targets.is_empty() {
            continue;
        }
        let mut ids = Vec::with_capacity(targets.len());
        for &target in targets {
            ids.push(Json::String(store.entity(target)?.id_string()));
        }
        record.insert(rel.key.to_string(), Json::Array(ids));
    }

    for join in &schema.joins {
        let mut entries = Vec::new();
        for join_id in store.fetch_joins(join.kind)? {
            let join_record = store.join(join_id)?;
            if join_record.parent != object {
                continue;
            }
            let mut entry = Map::new();
            entry.insert(
                join.child_key.to_string(),
                Json::String(store.entity(join_record.child)?.id_string()),
            );
            for attr in &join.attributes {
                if let Some(value) = (attr.get)(join_record) {
                    entry.insert(attr.key.to_string(), value.to_json());
                }
            }
            entries.push(Json::Object(entry));
        }
        // Absent key, not an empty array.
        if !entries.is_empty() {
            record.insert(join.key.to_string(), Json::Array(entries));
        }
    }

    Ok(Json::Object(record))
}
