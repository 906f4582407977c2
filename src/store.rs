//! Object store collaborator interface
//!
//! Persistence is external to the mapping engine: storage, indexing, and
//! transaction mechanics all live behind [`ObjectStore`]. The engine only
//! fetches, creates, mutates through handles, and asks for a single commit
//! at the end of an import. [`MemoryStore`] is the in-memory arena
//! implementation used by the tests.

use crate::entity::{Entity, EntityKind, JoinId, JoinKind, JoinRecord, ObjectId};
use crate::error::{PortError, Result};

/// The persistence seam the mapping engine runs against.
///
/// A store hands out arena-style handles; the engine never owns entities
/// beyond a single import/export call. Implementations are expected to be
/// used from one call at a time; the engine performs no internal locking.
pub trait ObjectStore {
    /// All objects of one entity kind.
    fn fetch_all(&self, kind: EntityKind) -> Result<Vec<ObjectId>>;

    /// All join records of one join kind.
    fn fetch_joins(&self, kind: JoinKind) -> Result<Vec<JoinId>>;

    /// Create an empty entity of the given kind.
    fn create(&mut self, kind: EntityKind) -> ObjectId;

    /// Create a join record linking `parent` and `child`.
    fn create_join(&mut self, kind: JoinKind, parent: ObjectId, child: ObjectId) -> JoinId;

    fn entity(&self, id: ObjectId) -> Result<&Entity>;

    fn entity_mut(&mut self, id: ObjectId) -> Result<&mut Entity>;

    fn join(&self, id: JoinId) -> Result<&JoinRecord>;

    fn join_mut(&mut self, id: JoinId) -> Result<&mut JoinRecord>;

    /// Persist everything created or mutated since the last commit. Called
    /// once per import, never per record.
    fn commit(&mut self) -> Result<()>;
}

/// Arena-backed in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entities: Vec<Entity>,
    joins: Vec<JoinRecord>,
    commits: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of commits performed, for asserting single-commit behavior.
    pub fn commit_count(&self) -> usize {
        self.commits
    }

    /// Total number of entities of one kind.
    pub fn count(&self, kind: EntityKind) -> usize {
        self.entities.iter().filter(|e| e.kind() == kind).count()
    }

    /// Total number of join records of one kind.
    pub fn join_count(&self, kind: JoinKind) -> usize {
        self.joins.iter().filter(|j| j.kind == kind).count()
    }

    /// Look up an entity by kind and identifier string.
    pub fn find(&self, kind: EntityKind, id: &str) -> Option<ObjectId> {
        self.entities
            .iter()
            .enumerate()
            .find(|(_, e)| e.kind() == kind && e.id.matches(id))
            .map(|(i, _)| ObjectId(i as u32))
    }
}

impl ObjectStore for MemoryStore {
    fn fetch_all(&self, kind: EntityKind) -> Result<Vec<ObjectId>> {
        Ok(self
            .entities
            .iter()
            .enumerate()
            .filter(|(_, e)| e.kind() == kind)
            .map(|(i, _)| ObjectId(i as u32))
            .collect())
    }

    fn fetch_joins(&self, kind: JoinKind) -> Result<Vec<JoinId>> {
        Ok(self
            .joins
            .iter()
            .enumerate()
            .filter(|(_, j)| j.kind == kind)
            .map(|(i, _)| JoinId(i as u32))
            .collect())
    }

    fn create(&mut self, kind: EntityKind) -> ObjectId {
        self.entities.push(Entity::empty(kind));
        ObjectId((self.entities.len() - 1) as u32)
    }

    fn create_join(&mut self, kind: JoinKind, parent: ObjectId, child: ObjectId) -> JoinId {
        self.joins.push(JoinRecord::new(kind, parent, child));
        JoinId((self.joins.len() - 1) as u32)
    }

    fn entity(&self, id: ObjectId) -> Result<&Entity> {
        self.entities.get(id.0 as usize).ok_or(PortError::UnknownObject)
    }

    fn entity_mut(&mut self, id: ObjectId) -> Result<&mut Entity> {
        self.entities
            .get_mut(id.0 as usize)
            .ok_or(PortError::UnknownObject)
    }

    fn join(&self, id: JoinId) -> Result<&JoinRecord> {
        self.joins.get(id.0 as usize).ok_or(PortError::UnknownObject)
    }

    fn join_mut(&mut self, id: JoinId) -> Result<&mut JoinRecord> {
        self.joins
            .get_mut(id.0 as usize)
            .ok_or(PortError::UnknownObject)
    }

    fn commit(&mut self) -> Result<()> {
        self.commits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityData;

    #[test]
    fn test_create_and_fetch() {
        let mut store = MemoryStore::new();
        let game = store.create(EntityKind::Game);
        store.create(EntityKind::Race);

        assert_eq!(store.fetch_all(EntityKind::Game).unwrap(), vec![game]);
        assert_eq!(store.count(EntityKind::Game), 1);
        assert_eq!(store.count(EntityKind::Module), 0);
    }

    #[test]
    fn test_mutate_through_handle() {
        let mut store = MemoryStore::new();
        let id = store.create(EntityKind::Game);
        if let EntityData::Game(game) = &mut store.entity_mut(id).unwrap().data {
            game.name = Some("Skyrim".to_string());
        }
        match &store.entity(id).unwrap().data {
            EntityData::Game(game) => assert_eq!(game.name.as_deref(), Some("Skyrim")),
            _ => panic!("expected a game"),
        }
    }

    #[test]
    fn test_join_records() {
        let mut store = MemoryStore::new();
        let module = store.create(EntityKind::Module);
        let ingredient = store.create(EntityKind::Ingredient);
        let join = store.create_join(JoinKind::ModuleIngredient, module, ingredient);

        store.join_mut(join).unwrap().quantity = Some(2);
        assert_eq!(store.fetch_joins(JoinKind::ModuleIngredient).unwrap().len(), 1);
        assert_eq!(store.join(join).unwrap().quantity, Some(2));
    }

    #[test]
    fn test_commit_counter() {
        let mut store = MemoryStore::new();
        assert_eq!(store.commit_count(), 0);
        store.commit().unwrap();
        assert_eq!(store.commit_count(), 1);
    }
}
