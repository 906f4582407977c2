//! Document import
//!
//! Walks an interchange document in the canonical dependency order and
//! merges it into the object graph: resolve-or-create by identifier, patch
//! attributes, wire relations through their descriptors. One synchronous
//! pass; the caller commits once afterwards.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::entity::{EntityKind, Identifier, JoinId, JoinKind, ObjectId};
use crate::error::{PortError, Result};
use crate::schema::{EntitySchema, JoinSpec, SchemaRegistry};
use crate::store::ObjectStore;
use crate::value::Value;

/// A non-fatal condition encountered while importing. These never abort the
/// run; they are collected so the caller can surface them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportCondition {
    /// No schema registered for this kind; its document section was skipped.
    SectionSkipped { kind: EntityKind },
    /// The store failed to fetch existing objects of this kind; the merge
    /// degraded to unconditional creation.
    FetchDegraded { kind: EntityKind },
    /// The store failed to fetch existing join records of this kind.
    JoinFetchDegraded { kind: JoinKind },
    /// A relation target could neither be found nor created; the relation
    /// was left unset.
    UnresolvedRelation {
        kind: EntityKind,
        record: String,
        relation: String,
    },
    /// A record carried an identifier that cannot exist for its kind; the
    /// record was skipped.
    InvalidIdentifier { kind: EntityKind, value: String },
}

/// Outcome of one import pass.
#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    pub conditions: Vec<ImportCondition>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Per-call resolution cache: all objects / join records of a kind, fetched
/// lazily on first use. Constructed at the start of each import call and
/// dropped at the end; every created object is appended so later records in
/// the same call can match it.
#[derive(Default)]
struct ResolveCache {
    objects: HashMap<EntityKind, Vec<ObjectId>>,
    joins: HashMap<JoinKind, Vec<JoinId>>,
}

/// Import one document into the store. Does not commit; callers (normally
/// the [`Porter`](crate::porter::Porter) facade) commit once on success.
pub fn import_document<S: ObjectStore>(
    registry: &SchemaRegistry,
    store: &mut S,
    document: &Json,
) -> Result<ImportReport> {
    let root = document.as_object().ok_or(PortError::MalformedDocument)?;

    let mut importer = Importer {
        registry,
        store,
        cache: ResolveCache::default(),
        report: ImportReport::default(),
    };

    for kind in EntityKind::DEPENDENCY_ORDER {
        let Some(schema) = registry.get(kind) else {
            importer
                .report
                .conditions
                .push(ImportCondition::SectionSkipped { kind });
            continue;
        };
        // An absent section is a legal document, not an error.
        let Some(records) = root.get(schema.array_key).and_then(Json::as_array) else {
            continue;
        };
        debug!(kind = ?kind, records = records.len(), "importing section");
        for record in records {
            importer.import_record(kind, record, true)?;
        }
    }

    Ok(importer.report)
}

struct Importer<'a, S: ObjectStore> {
    registry: &'a SchemaRegistry,
    store: &'a mut S,
    cache: ResolveCache,
    report: ImportReport,
}

impl<S: ObjectStore> Importer<'_, S> {
    /// Resolve or create the entity a fragment describes, then merge the
    /// fragment's attributes and relations onto it.
    ///
    /// A fragment is either a bare identifier string or a record object.
    /// The entity is entered into the cache before its relations are
    /// resolved, so cyclic references terminate by finding it there.
    fn import_record(
        &mut self,
        kind: EntityKind,
        fragment: &Json,
        top_level: bool,
    ) -> Result<Option<ObjectId>> {
        let Some(schema) = self.registry.get(kind) else {
            return Ok(None);
        };

        // A nested fragment must be a reference string or a record object.
        // Anything else (null in particular) names no target to resolve,
        // and inventing one would silently corrupt the graph.
        if !top_level && !fragment.is_string() && !fragment.is_object() {
            return Ok(None);
        }

        let id_text = fragment
            .as_str()
            .or_else(|| fragment.get("id").and_then(Json::as_str));

        let object = match self.resolve(schema, id_text, top_level)? {
            Some(object) => object,
            None => return Ok(None),
        };

        let Some(record) = fragment.as_object() else {
            // A bare identifier reference carries nothing to merge.
            return Ok(Some(object));
        };

        // Attribute merge is a patch: absent keys leave existing values
        // untouched, so a partial record is legal.
        for attr in &schema.attributes {
            if let Some(value) = record.get(attr.key).and_then(Value::from_json) {
                (attr.set)(self.store.entity_mut(object)?, &value);
            }
        }

        let record_id = self.store.entity(object)?.id_string();

        for rel in &schema.to_one {
            let Some(target_fragment) = record.get(rel.key) else {
                continue;
            };
            match self.import_record(rel.target, target_fragment, false)? {
                Some(target) => (rel.set)(self.store.entity_mut(object)?, target),
                None => self.unresolved(kind, &record_id, rel.key),
            }
        }

        for rel in &schema.to_many {
            let Some(targets) = record.get(rel.key).and_then(Json::as_array) else {
                continue;
            };
            for target_fragment in targets {
                match self.import_record(rel.target, target_fragment, false)? {
                    Some(target) => {
                        let entity = self.store.entity_mut(object)?;
                        // Membership is a set: additive and duplicate-free.
                        if !(rel.get)(entity).contains(&target) {
                            (rel.add)(entity, target);
                        }
                    }
                    None => self.unresolved(kind, &record_id, rel.key),
                }
            }
        }

        for join in &schema.joins {
            self.import_join(kind, object, &record_id, join, record)?;
        }

        Ok(Some(object))
    }

    /// Find an existing entity matching the identifier, or create one
    /// carrying it.
    fn resolve(
        &mut self,
        schema: &EntitySchema,
        id_text: Option<&str>,
        top_level: bool,
    ) -> Result<Option<ObjectId>> {
        let kind = schema.kind;
        self.ensure_objects(kind);

        if let Some(text) = id_text {
            for &object in self.cache.objects.entry(kind).or_default().iter() {
                if self.store.entity(object)?.id.matches(text) {
                    if top_level {
                        self.report.updated += 1;
                    }
                    return Ok(Some(object));
                }
            }
        }

        let identifier = match id_text {
            Some(text) => match Identifier::parse(text, schema.generated_id) {
                Some(identifier) => Some(identifier),
                None => {
                    self.report.conditions.push(ImportCondition::InvalidIdentifier {
                        kind,
                        value: text.to_string(),
                    });
                    return Ok(None);
                }
            },
            // A generated-id record without an id gets a fresh one; a
            // natural-id record without one has no key to exist under.
            None if schema.generated_id => None,
            None => {
                self.report.conditions.push(ImportCondition::InvalidIdentifier {
                    kind,
                    value: String::new(),
                });
                return Ok(None);
            }
        };

        let object = self.store.create(kind);
        if let Some(identifier) = identifier {
            self.store.entity_mut(object)?.id = identifier;
        }
        self.report.created += 1;
        self.cache.objects.entry(kind).or_default().push(object);
        Ok(Some(object))
    }

    /// Merge one join-relation array per the update-in-place contract: an
    /// existing (parent, child) record gets its attributes overwritten, a
    /// missing one is created, and a duplicate edge is never produced.
    fn import_join(
        &mut self,
        parent_kind: EntityKind,
        parent: ObjectId,
        record_id: &str,
        spec: &JoinSpec,
        record: &serde_json::Map<String, Json>,
    ) -> Result<()> {
        let Some(entries) = record.get(spec.key).and_then(Json::as_array) else {
            return Ok(());
        };
        self.ensure_joins(spec.kind);

        for entry in entries {
            let Some(child_fragment) = entry.get(spec.child_key) else {
                self.unresolved(parent_kind, record_id, spec.key);
                continue;
            };
            let child_id_text = child_fragment
                .as_str()
                .or_else(|| child_fragment.get("id").and_then(Json::as_str));

            let mut existing = None;
            for &join_id in self.cache.joins.entry(spec.kind).or_default().iter() {
                let join = self.store.join(join_id)?;
                if join.parent != parent {
                    continue;
                }
                let child_matches = match child_id_text {
                    Some(text) => self.store.entity(join.child)?.id.matches(text),
                    None => false,
                };
                if child_matches {
                    existing = Some(join_id);
                    break;
                }
            }

            let join_id = match existing {
                Some(join_id) => join_id,
                None => {
                    let Some(child) = self.import_record(spec.child, child_fragment, false)? else {
                        self.unresolved(parent_kind, record_id, spec.key);
                        continue;
                    };
                    let join_id = self.store.create_join(spec.kind, parent, child);
                    self.cache.joins.entry(spec.kind).or_default().push(join_id);
                    join_id
                }
            };

            for attr in &spec.attributes {
                if let Some(value) = entry.get(attr.key).and_then(Value::from_json) {
                    (attr.set)(self.store.join_mut(join_id)?, &value);
                }
            }
        }

        Ok(())
    }

    /// Populate the object cache for a kind. A failed fetch degrades the
    /// merge into an unconditional-create path rather than aborting.
    fn ensure_objects(&mut self, kind: EntityKind) {
        if self.cache.objects.contains_key(&kind) {
            return;
        }
        let objects = match self.store.fetch_all(kind) {
            Ok(objects) => objects,
            Err(error) => {
                warn!(kind = ?kind, %error, "fetch failed; treating as no existing objects");
                self.report
                    .conditions
                    .push(ImportCondition::FetchDegraded { kind });
                Vec::new()
            }
        };
        self.cache.objects.insert(kind, objects);
    }

    fn ensure_joins(&mut self, kind: JoinKind) {
        if self.cache.joins.contains_key(&kind) {
            return;
        }
        let joins = match self.store.fetch_joins(kind) {
            Ok(joins) => joins,
            Err(error) => {
                warn!(kind = ?kind, %error, "join fetch failed; treating as no existing records");
                self.report
                    .conditions
                    .push(ImportCondition::JoinFetchDegraded { kind });
                Vec::new()
            }
        };
        self.cache.joins.insert(kind, joins);
    }

    fn unresolved(&mut self, kind: EntityKind, record: &str, relation: &str) {
        self.report.conditions.push(ImportCondition::UnresolvedRelation {
            kind,
            record: record.to_string(),
            relation: relation.to_string(),
        });
    }
}
