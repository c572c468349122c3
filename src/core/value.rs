//! Runtime values for the expression language.
//!
//! Every expression evaluates to a `Value`: a closed tagged union covering
//! numbers, booleans, strings, player and entity references, board positions,
//! and null. The engine never interprets game meaning ("rank", "direction") -
//! specifications give meaning to attribute names, the engine just moves
//! typed values around.
//!
//! ## Equality
//!
//! Equality is structural, except `Player` and `Entity` which compare by
//! identity (their id). The `eq` builtin additionally compares mixed
//! `Int`/`Float` numerically; `Int`/`Int` comparison stays exact.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::entity::EntityId;
use super::player::PlayerId;

/// A coordinate on a grid board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A runtime value.
///
/// Values are immutable once produced. `Player` and `Entity` are non-owning
/// references: they hold an id resolved through the game state on access.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer number.
    Int(i64),
    /// Real number.
    Float(f64),
    /// Text.
    Str(String),
    /// Reference to a role, by identity.
    Player(PlayerId),
    /// Reference to a live entity, by identity.
    Entity(EntityId),
    /// Board position.
    Pos(Position),
}

impl Value {
    /// Check if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as boolean if this is a `Bool`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer if this is an `Int`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as float if this is numeric. Integers promote.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as string slice if this is a `Str`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get as player reference if this is a `Player`.
    #[must_use]
    pub fn as_player(&self) -> Option<PlayerId> {
        match self {
            Value::Player(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as entity reference if this is an `Entity`.
    #[must_use]
    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Value::Entity(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as position if this is a `Pos`.
    #[must_use]
    pub fn as_pos(&self) -> Option<Position> {
        match self {
            Value::Pos(p) => Some(*p),
            _ => None,
        }
    }

    /// Name of this value's type, for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Player(_) => "player",
            Value::Entity(_) => "entity",
            Value::Pos(_) => "position",
        }
    }

    /// Truthiness, used by `and`/`or`/`not` and conditional effects.
    ///
    /// Null is false, booleans are themselves, numbers are true unless zero,
    /// strings are true unless empty, references and positions are true.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Player(_) | Value::Entity(_) | Value::Pos(_) => true,
        }
    }

    /// Equality as seen by the `eq` builtin.
    ///
    /// Structural, except mixed `Int`/`Float` pairs which compare
    /// numerically. `Int`/`Int` stays exact.
    #[must_use]
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            _ => self == other,
        }
    }

    /// Numeric ordering for `gt`/`lt`/`ge`/`le`.
    ///
    /// `None` when either side is not a number.
    #[must_use]
    pub fn numeric_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            _ => self.as_float()?.partial_cmp(&other.as_float()?),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Position> for Value {
    fn from(v: Position) -> Self {
        Value::Pos(v)
    }
}

impl From<PlayerId> for Value {
    fn from(v: PlayerId) -> Self {
        Value::Player(v)
    }
}

impl From<EntityId> for Value {
    fn from(v: EntityId) -> Self {
        Value::Entity(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "'{s}'"),
            Value::Player(id) => write!(f, "{id}"),
            Value::Entity(id) => write!(f, "{id}"),
            Value::Pos(p) => write!(f, "{p}"),
        }
    }
}

/// Type tag for schema-declared attributes and global state variables.
///
/// Used at spawn/setup time to validate values against the specification;
/// never consulted during expression evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Bool,
    Int,
    Float,
    String,
    Player,
    Entity,
    Position,
}

impl ValueType {
    /// Check whether a value inhabits this type. Null is allowed everywhere.
    #[must_use]
    pub fn admits(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (ValueType::Bool, Value::Bool(_))
                | (ValueType::Int, Value::Int(_))
                | (ValueType::Float, Value::Float(_))
                | (ValueType::Float, Value::Int(_))
                | (ValueType::String, Value::Str(_))
                | (ValueType::Player, Value::Player(_))
                | (ValueType::Entity, Value::Entity(_))
                | (ValueType::Position, Value::Pos(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Int(5).as_int(), Some(5));
        assert_eq!(Value::Int(5).as_float(), Some(5.0));
        assert_eq!(Value::Float(2.5).as_float(), Some(2.5));
        assert_eq!(Value::Float(2.5).as_int(), None);
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Str("man".into()).as_str(), Some("man"));
        assert_eq!(Value::Pos(Position::new(3, 1)).as_pos(), Some(Position::new(3, 1)));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(Value::Entity(EntityId(7)).is_truthy());
        assert!(Value::Pos(Position::new(0, 0)).is_truthy());
    }

    #[test]
    fn test_loose_eq_numbers() {
        assert!(Value::Int(2).loose_eq(&Value::Int(2)));
        assert!(!Value::Int(2).loose_eq(&Value::Int(3)));
        assert!(Value::Int(2).loose_eq(&Value::Float(2.0)));
        assert!(Value::Float(2.0).loose_eq(&Value::Int(2)));
        assert!(!Value::Int(2).loose_eq(&Value::Str("2".into())));
    }

    #[test]
    fn test_identity_equality() {
        assert_eq!(Value::Entity(EntityId(1)), Value::Entity(EntityId(1)));
        assert_ne!(Value::Entity(EntityId(1)), Value::Entity(EntityId(2)));
        assert_ne!(Value::Player(PlayerId::new(0)), Value::Entity(EntityId(0)));
    }

    #[test]
    fn test_numeric_cmp() {
        use std::cmp::Ordering;

        assert_eq!(Value::Int(3).numeric_cmp(&Value::Int(2)), Some(Ordering::Greater));
        assert_eq!(Value::Int(2).numeric_cmp(&Value::Float(2.5)), Some(Ordering::Less));
        assert_eq!(Value::Str("a".into()).numeric_cmp(&Value::Int(1)), None);
    }

    #[test]
    fn test_value_type_admits() {
        assert!(ValueType::Int.admits(&Value::Int(1)));
        assert!(ValueType::Float.admits(&Value::Int(1)));
        assert!(!ValueType::Int.admits(&Value::Float(1.0)));
        assert!(ValueType::String.admits(&Value::Null));
        assert!(!ValueType::Position.admits(&Value::Int(3)));
    }

    #[test]
    fn test_serialization() {
        let v = Value::Pos(Position::new(2, 3));
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
