//! The closed entity model
//!
//! Every entity type the mapping engine knows about is enumerated here,
//! together with its identifier strategy and the canonical dependency order
//! in which documents are processed. Relationships are stored as arena
//! handles rather than object references, so the self-referential module
//! graph cannot form reference cycles.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Handle to an entity in the object store's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u32);

/// Handle to a join record in the object store's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JoinId(pub(crate) u32);

/// Stable identity of one entity.
///
/// Most entity types carry a generated UUID; ingredients are keyed by a
/// caller-supplied string instead. Which strategy applies is declared on the
/// entity's schema, never inferred from the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Generated(Uuid),
    Natural(String),
}

impl Identifier {
    /// Parse an identifier from its document string form.
    pub fn parse(text: &str, generated: bool) -> Option<Self> {
        if generated {
            Uuid::parse_str(text).ok().map(Identifier::Generated)
        } else if text.is_empty() {
            None
        } else {
            Some(Identifier::Natural(text.to_string()))
        }
    }

    /// Whether this identifier matches a document string. Generated
    /// identifiers compare as parsed UUIDs, so case differences in the hex
    /// digits do not matter; natural identifiers compare exactly.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Identifier::Generated(uuid) => Uuid::parse_str(text)
                .map(|other| *uuid == other)
                .unwrap_or(false),
            Identifier::Natural(s) => s == text,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Uppercase hyphenated, the wire form shared documents use.
            Identifier::Generated(uuid) => {
                write!(f, "{}", uuid.hyphenated().encode_upper(&mut Uuid::encode_buffer()))
            }
            Identifier::Natural(s) => write!(f, "{}", s),
        }
    }
}

/// The entity types of the graph, a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Game,
    AttributeType,
    AttributeTypeSection,
    Attribute,
    ModuleType,
    Ingredient,
    Module,
    Race,
    Character,
}

impl EntityKind {
    /// The fixed order in which document sections are imported. Every
    /// relation target appears before its dependents, which is what makes
    /// forward references inside a single document resolvable.
    pub const DEPENDENCY_ORDER: [EntityKind; 9] = [
        EntityKind::Game,
        EntityKind::AttributeType,
        EntityKind::AttributeTypeSection,
        EntityKind::Attribute,
        EntityKind::ModuleType,
        EntityKind::Ingredient,
        EntityKind::Module,
        EntityKind::Race,
        EntityKind::Character,
    ];
}

/// The attributed many-to-many link types, a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    CharacterModule,
    CharacterAttribute,
    ModuleIngredient,
    ModuleAttribute,
    ModuleModule,
}

#[derive(Debug, Clone, Default)]
pub struct Game {
    pub name: Option<String>,
    pub index: i64,
    pub mainline: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AttributeType {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AttributeTypeSection {
    pub name: Option<String>,
    pub min_priority: i64,
    pub max_priority: i64,
    pub attribute_type: Option<ObjectId>,
}

#[derive(Debug, Clone, Default)]
pub struct Attribute {
    pub name: Option<String>,
    pub attribute_type: Option<ObjectId>,
    pub games: Vec<ObjectId>,
}

#[derive(Debug, Clone, Default)]
pub struct ModuleType {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Ingredient {
    pub name: Option<String>,
    pub games: Vec<ObjectId>,
}

#[derive(Debug, Clone, Default)]
pub struct Module {
    pub name: Option<String>,
    pub notes: Option<String>,
    pub level: i64,
    pub module_type: Option<ObjectId>,
    pub games: Vec<ObjectId>,
}

#[derive(Debug, Clone, Default)]
pub struct Race {
    pub name: Option<String>,
    pub games: Vec<ObjectId>,
}

#[derive(Debug, Clone, Default)]
pub struct Character {
    pub name: Option<String>,
    pub female: bool,
    pub race: Option<ObjectId>,
    pub game: Option<ObjectId>,
}

/// One entity in the graph: its identifier plus the typed fields of its kind.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: Identifier,
    pub data: EntityData,
}

#[derive(Debug, Clone)]
pub enum EntityData {
    Game(Game),
    AttributeType(AttributeType),
    AttributeTypeSection(AttributeTypeSection),
    Attribute(Attribute),
    ModuleType(ModuleType),
    Ingredient(Ingredient),
    Module(Module),
    Race(Race),
    Character(Character),
}

impl Entity {
    /// Create an empty entity of the given kind with a placeholder
    /// identifier. The importer overwrites the identifier from the document
    /// before the entity is ever matched against.
    pub fn empty(kind: EntityKind) -> Self {
        let data = match kind {
            EntityKind::Game => EntityData::Game(Game::default()),
            EntityKind::AttributeType => EntityData::AttributeType(AttributeType::default()),
            EntityKind::AttributeTypeSection => {
                EntityData::AttributeTypeSection(AttributeTypeSection::default())
            }
            EntityKind::Attribute => EntityData::Attribute(Attribute::default()),
            EntityKind::ModuleType => EntityData::ModuleType(ModuleType::default()),
            EntityKind::Ingredient => EntityData::Ingredient(Ingredient::default()),
            EntityKind::Module => EntityData::Module(Module::default()),
            EntityKind::Race => EntityData::Race(Race::default()),
            EntityKind::Character => EntityData::Character(Character::default()),
        };
        Entity {
            id: Identifier::Generated(Uuid::new_v4()),
            data,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match &self.data {
            EntityData::Game(_) => EntityKind::Game,
            EntityData::AttributeType(_) => EntityKind::AttributeType,
            EntityData::AttributeTypeSection(_) => EntityKind::AttributeTypeSection,
            EntityData::Attribute(_) => EntityKind::Attribute,
            EntityData::ModuleType(_) => EntityKind::ModuleType,
            EntityData::Ingredient(_) => EntityKind::Ingredient,
            EntityData::Module(_) => EntityKind::Module,
            EntityData::Race(_) => EntityKind::Race,
            EntityData::Character(_) => EntityKind::Character,
        }
    }

    /// The identifier in its document string form.
    pub fn id_string(&self) -> String {
        self.id.to_string()
    }
}

/// A materialized many-to-many edge that carries its own attributes.
///
/// The (parent, child) pair is unique within a join kind; re-importing the
/// same pair updates the attributes in place rather than duplicating the
/// edge.
#[derive(Debug, Clone)]
pub struct JoinRecord {
    pub kind: JoinKind,
    pub parent: ObjectId,
    pub child: ObjectId,
    pub completed: Option<bool>,
    pub priority: Option<i64>,
    pub quantity: Option<i64>,
}

impl JoinRecord {
    pub fn new(kind: JoinKind, parent: ObjectId, child: ObjectId) -> Self {
        JoinRecord {
            kind,
            parent,
            child,
            completed: None,
            priority: None,
            quantity: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_identifier_matches_case_insensitively() {
        let id = Identifier::parse("9E4F2A36-0C1D-4B6A-8D2E-5F7B9C1D3E5A", true).unwrap();
        assert!(id.matches("9e4f2a36-0c1d-4b6a-8d2e-5f7b9c1d3e5a"));
        assert!(!id.matches("not-a-uuid"));
    }

    #[test]
    fn test_generated_identifier_displays_uppercase() {
        let id = Identifier::parse("9e4f2a36-0c1d-4b6a-8d2e-5f7b9c1d3e5a", true).unwrap();
        assert_eq!(id.to_string(), "9E4F2A36-0C1D-4B6A-8D2E-5F7B9C1D3E5A");
    }

    #[test]
    fn test_natural_identifier_is_exact() {
        let id = Identifier::parse("ingredient_iron_ingot", false).unwrap();
        assert!(id.matches("ingredient_iron_ingot"));
        assert!(!id.matches("Ingredient_Iron_Ingot"));
    }

    #[test]
    fn test_invalid_identifier_forms() {
        assert!(Identifier::parse("not-a-uuid", true).is_none());
        assert!(Identifier::parse("", false).is_none());
    }

    #[test]
    fn test_dependency_order_covers_every_kind() {
        use std::collections::HashSet;
        let kinds: HashSet<_> = EntityKind::DEPENDENCY_ORDER.iter().collect();
        assert_eq!(kinds.len(), 9);
    }
}
