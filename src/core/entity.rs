//! Live game entities and their schemas.
//!
//! Every piece on the board is an `Entity`: a unique id, a schema name, an
//! optional owner, an optional position, and a bag of typed attributes. The
//! game state's arena exclusively owns entities; board cells and expression
//! contexts refer to them by `EntityId` only and resolve through the arena on
//! each access.
//!
//! `EntitySchema` describes an entity type from the specification's
//! `entity_schemas` section. It is consulted once, at spawn time, to default
//! and validate attributes - never during expression evaluation.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::player::PlayerId;
use super::value::{Position, Value, ValueType};

/// Unique identifier for a live entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Get the raw id value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Declared shape of one schema attribute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    /// Expected value type.
    #[serde(rename = "type")]
    pub ty: ValueType,

    /// Value used when a spawn step does not set the attribute.
    #[serde(default)]
    pub default: Value,
}

/// A named entity type with its attribute declarations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Schema name ("Piece", "Man", ...).
    pub name: String,

    /// Attribute declarations by name.
    #[serde(default)]
    pub attributes: FxHashMap<String, AttributeSpec>,
}

impl EntitySchema {
    /// Create a schema with no attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: FxHashMap::default(),
        }
    }

    /// Declare an attribute, builder style.
    #[must_use]
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        ty: ValueType,
        default: impl Into<Value>,
    ) -> Self {
        self.attributes.insert(
            name.into(),
            AttributeSpec {
                ty,
                default: default.into(),
            },
        );
        self
    }
}

/// A live game object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Identity, unique for the lifetime of the game state.
    pub id: EntityId,

    /// Name of the schema this entity was spawned from.
    pub schema: String,

    /// Owning role, if any.
    pub owner: Option<PlayerId>,

    /// Current board position. `None` while off-board.
    pub pos: Option<Position>,

    /// Mutable attributes ("rank", ...).
    pub attributes: FxHashMap<String, Value>,
}

impl Entity {
    /// Create a new entity. Ids are allocated by the game state.
    pub fn new(id: EntityId, schema: impl Into<String>) -> Self {
        Self {
            id,
            schema: schema.into(),
            owner: None,
            pos: None,
            attributes: FxHashMap::default(),
        }
    }

    /// Look up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Overwrite an attribute.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }
}
