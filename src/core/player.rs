//! Player roles.
//!
//! A player is a role from the specification's `players` section: a name
//! plus a bag of per-role constants (`pawn_direction`, `promotion_row`, ...).
//! Roles are created at load time and stay fixed for the game; anything a
//! game wants to vary per turn belongs in global state instead.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::value::Value;

/// Player identifier.
///
/// Indices are 0-based in declaration order of the specification's roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// Create a new player ID.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Get the raw player index (0-based).
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Player {}", self.0)
    }
}

/// A role with a name and static attributes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Identity of this role.
    pub id: PlayerId,

    /// Role name as declared in the specification ("White", "Red", ...).
    pub name: String,

    /// Per-role constants, read via `<player>.<name>` in expressions.
    pub attributes: FxHashMap<String, Value>,
}

impl Player {
    /// Create a new player role.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            attributes: FxHashMap::default(),
        }
    }

    /// Add an attribute, builder style.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Look up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}
