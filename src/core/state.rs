//! Game state: players, entities, board, and global variables.
//!
//! One `GameState` exists per game session, exclusively owned by the driver.
//! The validator borrows it for the duration of one move attempt; multi-step
//! validation clones it into a private working copy and commits the copy
//! back only when every segment validates.
//!
//! The entity arena is the single owner of entity storage. Board cells and
//! expression contexts hold bare `EntityId`s and resolve them here on each
//! access, so there are no ownership cycles and a dangling id is simply a
//! failed lookup.
//!
//! Uses `im` persistent maps for the arena so the simulation working copy
//! is an O(1) clone.

use im::HashMap as ImHashMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::board::Board;
use super::entity::{Entity, EntityId};
use super::player::{Player, PlayerId};
use super::value::{Position, Value};

/// Complete state of one game session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Roles, fixed after setup. Indexed by `PlayerId`.
    players: Vec<Player>,

    /// Entity arena: the owning store for all live entities.
    entities: ImHashMap<EntityId, Entity>,

    /// Cell occupancy.
    pub board: Board,

    /// Global state variables, read via `state.<name>`.
    globals: FxHashMap<String, Value>,

    /// Next id handed out by `spawn`.
    next_entity_id: u32,
}

impl GameState {
    /// Create a state with the given roles and an empty board.
    #[must_use]
    pub fn new(players: Vec<Player>, board: Board) -> Self {
        Self {
            players,
            entities: ImHashMap::new(),
            board,
            globals: FxHashMap::default(),
            next_entity_id: 0,
        }
    }

    // === Players ===

    /// All roles, in declaration order.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Number of roles.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Look up a role by id.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id.index())
    }

    /// Look up a role by name.
    #[must_use]
    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    /// Mutable access to a role, for the rare specification that rewrites a
    /// player attribute by effect.
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id.index())
    }

    // === Entities ===

    /// Spawn an entity, returning its freshly allocated id.
    ///
    /// If `pos` is set, the entity is also placed on the board.
    pub fn spawn(
        &mut self,
        schema: impl Into<String>,
        owner: Option<PlayerId>,
        pos: Option<Position>,
        attributes: FxHashMap<String, Value>,
    ) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;

        let mut entity = Entity::new(id, schema);
        entity.owner = owner;
        entity.pos = pos;
        entity.attributes = attributes;
        self.entities.insert(id, entity);

        if let Some(pos) = pos {
            self.board.place(pos, id);
        }
        id
    }

    /// Resolve an entity id.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Resolve an entity id mutably.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Entity occupying a board position, if any.
    #[must_use]
    pub fn entity_at(&self, pos: Position) -> Option<&Entity> {
        self.board.occupant(pos).and_then(|id| self.entity(id))
    }

    /// Delete an entity from the arena and sweep any board cell that still
    /// references it.
    ///
    /// Returns the removed entity, or `None` if the id was not live.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let removed = self.entities.remove(&id);
        if removed.is_some() {
            self.board.clear_entity(id);
        }
        removed
    }

    /// Iterate over all live entities.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    // === Global state ===

    /// Read a global variable.
    #[must_use]
    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// Overwrite a global variable.
    pub fn set_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), value);
    }

    /// Iterate over global variables.
    pub fn globals(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.globals.iter().map(|(k, v)| (k.as_str(), v))
    }
}
