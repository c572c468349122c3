//! Grid board: cell occupancy over a rectangular topology.
//!
//! The board maps positions to entity ids. It owns no entities - cells hold
//! identities resolved through the game state's arena. Occupancy and each
//! entity's own `pos` are kept in step by effects; the board itself only
//! stores and answers.
//!
//! Backed by `im::HashMap` so cloning a board for move simulation is O(1)
//! structural sharing.

use im::HashMap as ImHashMap;
use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use super::value::Position;

/// Rectangular grid with sparse occupancy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    width: i32,
    height: i32,
    cells: ImHashMap<Position, EntityId>,
}

impl Board {
    /// Create an empty `width` x `height` board.
    ///
    /// Valid positions are `0 <= x < width`, `0 <= y < height`.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "Board dimensions must be positive");
        Self {
            width,
            height,
            cells: ImHashMap::new(),
        }
    }

    /// Board width.
    #[must_use]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Board height.
    #[must_use]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Check whether a position lies on the board.
    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        (0..self.width).contains(&pos.x) && (0..self.height).contains(&pos.y)
    }

    /// Entity occupying a cell, if any.
    #[must_use]
    pub fn occupant(&self, pos: Position) -> Option<EntityId> {
        self.cells.get(&pos).copied()
    }

    /// Place an entity id in a cell, replacing any previous occupant.
    pub fn place(&mut self, pos: Position, entity: EntityId) {
        self.cells.insert(pos, entity);
    }

    /// Empty a cell.
    pub fn clear(&mut self, pos: Position) {
        self.cells.remove(&pos);
    }

    /// Remove every cell referencing an entity.
    ///
    /// Normally an entity occupies at most one cell; sweeping all of them
    /// keeps the occupancy invariant even if a specification's effects left
    /// a stale reference behind.
    pub fn clear_entity(&mut self, entity: EntityId) {
        let stale: Vec<Position> = self
            .cells
            .iter()
            .filter(|(_, id)| **id == entity)
            .map(|(pos, _)| *pos)
            .collect();
        for pos in stale {
            self.cells.remove(&pos);
        }
    }

    /// Iterate over occupied cells.
    pub fn occupied(&self) -> impl Iterator<Item = (Position, EntityId)> + '_ {
        self.cells.iter().map(|(pos, id)| (*pos, *id))
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.cells.len()
    }

    /// Check that every cell strictly between `a` and `b` along a straight
    /// line is empty.
    ///
    /// Straight means horizontal, vertical, or exact diagonal. Returns
    /// `false` (not an error) when the pair is not on a straight line;
    /// adjacent cells have nothing between them and are trivially clear.
    #[must_use]
    pub fn path_clear(&self, a: Position, b: Position) -> bool {
        let dx = b.x - a.x;
        let dy = b.y - a.y;

        let straight = dx == 0 || dy == 0 || dx.abs() == dy.abs();
        if !straight || (dx == 0 && dy == 0) {
            return false;
        }

        let step_x = dx.signum();
        let step_y = dy.signum();
        let steps = dx.abs().max(dy.abs());

        (1..steps).all(|i| {
            let cell = Position::new(a.x + step_x * i, a.y + step_y * i);
            self.occupant(cell).is_none()
        })
    }
}
