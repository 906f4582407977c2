//! Entity schemas and the schema registry
//!
//! Each entity type is described declaratively: its document array key, its
//! scalar attributes as typed getter/setter pairs, and its relations as a
//! closed set of descriptor variants (to-one, to-many, join). The importer
//! and exporter drive everything through these descriptors and never touch
//! entity fields by name.

use std::collections::HashMap;

use crate::entity::{Entity, EntityData, EntityKind, JoinKind, JoinRecord, ObjectId};
use crate::error::{PortError, Result};
use crate::value::Value;

/// Read one scalar attribute from an entity. `None` means the attribute is
/// unset and contributes no document key.
pub type AttrGet = fn(&Entity) -> Option<Value>;

/// Write one scalar attribute. A value of the wrong shape is ignored,
/// leaving the existing field untouched.
pub type AttrSet = fn(&mut Entity, &Value);

/// A scalar attribute: document key plus its typed accessor pair.
pub struct AttributeSpec {
    pub key: &'static str,
    pub get: AttrGet,
    pub set: AttrSet,
}

/// A to-one relation descriptor.
pub struct ToOneSpec {
    pub key: &'static str,
    pub target: EntityKind,
    /// Export the target's full fragment nested under the key instead of a
    /// bare identifier reference (used for the attribute type on a section).
    pub inline: bool,
    pub get: fn(&Entity) -> Option<ObjectId>,
    pub set: fn(&mut Entity, ObjectId),
}

/// A to-many relation descriptor. Membership is a set: the importer checks
/// for existing membership before calling `add`, and never removes members.
pub struct ToManySpec {
    pub key: &'static str,
    pub target: EntityKind,
    pub get: for<'a> fn(&'a Entity) -> &'a [ObjectId],
    pub add: fn(&mut Entity, ObjectId),
}

/// A join-record attribute: document key plus accessors on the join record.
pub struct JoinAttributeSpec {
    pub key: &'static str,
    pub get: fn(&JoinRecord) -> Option<Value>,
    pub set: fn(&mut JoinRecord, &Value),
}

/// A join relation descriptor: a many-to-many link realized as an
/// intermediate record that carries its own attributes.
pub struct JoinSpec {
    /// Document key of the array on the parent's fragment.
    pub key: &'static str,
    pub kind: JoinKind,
    /// Document key holding the child's identifier inside each array entry.
    pub child_key: &'static str,
    pub child: EntityKind,
    pub attributes: Vec<JoinAttributeSpec>,
}

/// Declarative description of one entity type.
pub struct EntitySchema {
    pub kind: EntityKind,
    /// Key of this type's record array in the interchange document.
    pub array_key: &'static str,
    /// Whether identifiers are generated UUIDs (the default) or
    /// caller-supplied natural strings. Part of the schema, never inferred.
    pub generated_id: bool,
    pub attributes: Vec<AttributeSpec>,
    pub to_one: Vec<ToOneSpec>,
    pub to_many: Vec<ToManySpec>,
    pub joins: Vec<JoinSpec>,
}

/// The schema table, constructed explicitly at startup and passed by
/// reference into the importer and exporter. Read-only after construction.
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: HashMap<EntityKind, EntitySchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one entity schema.
    ///
    /// Registration must happen bottom-up: every relation target (except a
    /// self-reference, as in the module parent/child join) must already be
    /// registered, which guarantees the importer can always resolve relation
    /// targets of a registered type.
    pub fn register(&mut self, schema: EntitySchema) -> Result<()> {
        let kind = schema.kind;
        let targets = schema
            .to_one
            .iter()
            .map(|r| r.target)
            .chain(schema.to_many.iter().map(|r| r.target))
            .chain(schema.joins.iter().map(|j| j.child));
        for target in targets {
            if target != kind && !self.schemas.contains_key(&target) {
                return Err(PortError::TargetNotRegistered {
                    schema: kind,
                    target,
                });
            }
        }
        self.schemas.insert(kind, schema);
        Ok(())
    }

    pub fn get(&self, kind: EntityKind) -> Option<&EntitySchema> {
        self.schemas.get(&kind)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// The full character-tracker registry: all nine entity types and five
    /// join kinds, registered in dependency order.
    pub fn character_tracker() -> Self {
        let mut registry = Self::new();
        for schema in character_tracker_schemas() {
            registry
                .register(schema)
                .expect("built-in schemas are registered in dependency order");
        }
        registry
    }
}

macro_rules! text_attr {
    ($key:literal, $variant:ident, $field:ident) => {
        AttributeSpec {
            key: $key,
            get: |e| match &e.data {
                EntityData::$variant(x) => x.$field.clone().map(Value::Text),
                _ => None,
            },
            set: |e, v| {
                if let EntityData::$variant(x) = &mut e.data {
                    if let Some(s) = v.as_text() {
                        x.$field = Some(s.to_string());
                    }
                }
            },
        }
    };
}

macro_rules! int_attr {
    ($key:literal, $variant:ident, $field:ident) => {
        AttributeSpec {
            key: $key,
            get: |e| match &e.data {
                EntityData::$variant(x) => Some(Value::Int(x.$field)),
                _ => None,
            },
            set: |e, v| {
                if let EntityData::$variant(x) = &mut e.data {
                    if let Some(i) = v.as_int() {
                        x.$field = i;
                    }
                }
            },
        }
    };
}

macro_rules! bool_attr {
    ($key:literal, $variant:ident, $field:ident) => {
        AttributeSpec {
            key: $key,
            get: |e| match &e.data {
                EntityData::$variant(x) => Some(Value::Bool(x.$field)),
                _ => None,
            },
            set: |e, v| {
                if let EntityData::$variant(x) = &mut e.data {
                    if let Some(b) = v.as_bool() {
                        x.$field = b;
                    }
                }
            },
        }
    };
}

macro_rules! to_one {
    ($key:literal, $variant:ident, $field:ident, $target:ident, inline: $inline:literal) => {
        ToOneSpec {
            key: $key,
            target: EntityKind::$target,
            inline: $inline,
            get: |e| match &e.data {
                EntityData::$variant(x) => x.$field,
                _ => None,
            },
            set: |e, id| {
                if let EntityData::$variant(x) = &mut e.data {
                    x.$field = Some(id);
                }
            },
        }
    };
}

macro_rules! to_many {
    ($key:literal, $variant:ident, $field:ident, $target:ident) => {{
        fn get(e: &Entity) -> &[ObjectId] {
            match &e.data {
                EntityData::$variant(x) => x.$field.as_slice(),
                _ => &[],
            }
        }
        fn add(e: &mut Entity, id: ObjectId) {
            if let EntityData::$variant(x) = &mut e.data {
                x.$field.push(id);
            }
        }
        ToManySpec {
            key: $key,
            target: EntityKind::$target,
            get,
            add,
        }
    }};
}

fn completed_attr() -> JoinAttributeSpec {
    JoinAttributeSpec {
        key: "completed",
        get: |j| j.completed.map(Value::Bool),
        set: |j, v| {
            if let Some(b) = v.as_bool() {
                j.completed = Some(b);
            }
        },
    }
}

fn priority_attr() -> JoinAttributeSpec {
    JoinAttributeSpec {
        key: "priority",
        get: |j| j.priority.map(Value::Int),
        set: |j, v| {
            if let Some(i) = v.as_int() {
                j.priority = Some(i);
            }
        },
    }
}

fn quantity_attr() -> JoinAttributeSpec {
    JoinAttributeSpec {
        key: "quantity",
        get: |j| j.quantity.map(Value::Int),
        set: |j, v| {
            if let Some(i) = v.as_int() {
                j.quantity = Some(i);
            }
        },
    }
}

/// The built-in schemas in dependency order.
fn character_tracker_schemas() -> Vec<EntitySchema> {
    vec![
        EntitySchema {
            kind: EntityKind::Game,
            array_key: "games",
            generated_id: true,
            attributes: vec![
                text_attr!("name", Game, name),
                int_attr!("index", Game, index),
                bool_attr!("mainline", Game, mainline),
            ],
            to_one: vec![],
            to_many: vec![],
            joins: vec![],
        },
        EntitySchema {
            kind: EntityKind::AttributeType,
            array_key: "attribute_types",
            generated_id: true,
            attributes: vec![text_attr!("name", AttributeType, name)],
            to_one: vec![],
            to_many: vec![],
            joins: vec![],
        },
        EntitySchema {
            kind: EntityKind::AttributeTypeSection,
            array_key: "attribute_type_sections",
            generated_id: true,
            attributes: vec![
                text_attr!("name", AttributeTypeSection, name),
                int_attr!("maxPriority", AttributeTypeSection, max_priority),
                int_attr!("minPriority", AttributeTypeSection, min_priority),
            ],
            to_one: vec![to_one!(
                "type",
                AttributeTypeSection,
                attribute_type,
                AttributeType,
                inline: true
            )],
            to_many: vec![],
            joins: vec![],
        },
        EntitySchema {
            kind: EntityKind::Attribute,
            array_key: "attributes",
            generated_id: true,
            attributes: vec![text_attr!("name", Attribute, name)],
            to_one: vec![to_one!("type", Attribute, attribute_type, AttributeType, inline: false)],
            to_many: vec![to_many!("games", Attribute, games, Game)],
            joins: vec![],
        },
        EntitySchema {
            kind: EntityKind::ModuleType,
            array_key: "module_types",
            generated_id: true,
            attributes: vec![text_attr!("name", ModuleType, name)],
            to_one: vec![],
            to_many: vec![],
            joins: vec![],
        },
        EntitySchema {
            kind: EntityKind::Ingredient,
            array_key: "ingredients",
            generated_id: false,
            attributes: vec![text_attr!("name", Ingredient, name)],
            to_one: vec![],
            to_many: vec![to_many!("games", Ingredient, games, Game)],
            joins: vec![],
        },
        EntitySchema {
            kind: EntityKind::Module,
            array_key: "modules",
            generated_id: true,
            attributes: vec![
                text_attr!("name", Module, name),
                int_attr!("level", Module, level),
                text_attr!("notes", Module, notes),
            ],
            to_one: vec![to_one!("type", Module, module_type, ModuleType, inline: false)],
            to_many: vec![to_many!("games", Module, games, Game)],
            joins: vec![
                JoinSpec {
                    key: "ingredients",
                    kind: JoinKind::ModuleIngredient,
                    child_key: "ingredient",
                    child: EntityKind::Ingredient,
                    attributes: vec![quantity_attr()],
                },
                JoinSpec {
                    key: "attributes",
                    kind: JoinKind::ModuleAttribute,
                    child_key: "attribute",
                    child: EntityKind::Attribute,
                    attributes: vec![],
                },
                JoinSpec {
                    key: "children",
                    kind: JoinKind::ModuleModule,
                    child_key: "child",
                    child: EntityKind::Module,
                    attributes: vec![],
                },
            ],
        },
        EntitySchema {
            kind: EntityKind::Race,
            array_key: "races",
            generated_id: true,
            attributes: vec![text_attr!("name", Race, name)],
            to_one: vec![],
            to_many: vec![to_many!("games", Race, games, Game)],
            joins: vec![],
        },
        EntitySchema {
            kind: EntityKind::Character,
            array_key: "characters",
            generated_id: true,
            attributes: vec![
                bool_attr!("female", Character, female),
                text_attr!("name", Character, name),
            ],
            to_one: vec![
                to_one!("race", Character, race, Race, inline: false),
                to_one!("game", Character, game, Game, inline: false),
            ],
            to_many: vec![],
            joins: vec![
                JoinSpec {
                    key: "modules",
                    kind: JoinKind::CharacterModule,
                    child_key: "module",
                    child: EntityKind::Module,
                    attributes: vec![completed_attr()],
                },
                JoinSpec {
                    key: "attributes",
                    kind: JoinKind::CharacterAttribute,
                    child_key: "attribute",
                    child: EntityKind::Attribute,
                    attributes: vec![priority_attr()],
                },
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_built_in_registry_is_complete() {
        let registry = SchemaRegistry::character_tracker();
        assert_eq!(registry.len(), 9);
        for kind in EntityKind::DEPENDENCY_ORDER {
            assert!(registry.get(kind).is_some(), "missing schema for {:?}", kind);
        }
    }

    #[test]
    fn test_out_of_order_registration_is_rejected() {
        let mut registry = SchemaRegistry::new();
        // Characters reference races and games, neither registered yet.
        let character = character_tracker_schemas().pop().unwrap();
        match registry.register(character) {
            Err(PortError::TargetNotRegistered { schema, .. }) => {
                assert_eq!(schema, EntityKind::Character);
            }
            other => panic!("expected TargetNotRegistered, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_self_referential_join_registers() {
        // The module schema's "children" join targets modules themselves.
        let registry = SchemaRegistry::character_tracker();
        let module = registry.get(EntityKind::Module).unwrap();
        let children = module.joins.iter().find(|j| j.key == "children").unwrap();
        assert_eq!(children.child, EntityKind::Module);
    }

    #[test]
    fn test_accessors_round_trip_through_entity() {
        let registry = SchemaRegistry::character_tracker();
        let schema = registry.get(EntityKind::Game).unwrap();
        let mut game = Entity::empty(EntityKind::Game);

        let name = schema.attributes.iter().find(|a| a.key == "name").unwrap();
        (name.set)(&mut game, &Value::Text("Oblivion".into()));
        assert_eq!((name.get)(&game), Some(Value::Text("Oblivion".into())));

        let mainline = schema.attributes.iter().find(|a| a.key == "mainline").unwrap();
        // Wrong shape leaves the field untouched.
        (mainline.set)(&mut game, &Value::Text("yes".into()));
        assert_eq!((mainline.get)(&game), Some(Value::Bool(false)));
    }

    #[test]
    fn test_natural_id_flag_is_schema_data() {
        let registry = SchemaRegistry::character_tracker();
        assert!(!registry.get(EntityKind::Ingredient).unwrap().generated_id);
        assert!(registry.get(EntityKind::Module).unwrap().generated_id);
    }
}
