//! # tabula
//!
//! A data-driven rules engine for turn-based board games.
//!
//! ## Design Principles
//!
//! 1. **Game-Agnostic**: No hardcoded pieces, moves, or win conditions.
//!    Chess and checkers are both just specification documents; the engine
//!    evaluates their expression trees against a mutable game state.
//!
//! 2. **Pure Reads, Explicit Writes**: Condition evaluation cannot mutate
//!    anything - only effect execution can, through its own API.
//!
//! 3. **Simulate-Then-Commit**: Multi-step moves validate on a throwaway
//!    working copy of the state (an O(1) clone via `im`) and commit
//!    atomically; a rejected attempt is never observable.
//!
//! ## Modules
//!
//! - `core`: Values, players, entities, board, game state
//! - `expr`: The expression language - parser and pure evaluator
//! - `rules`: Compiled actions, effect execution, the move validator
//! - `spec`: JSON specification documents and setup
//! - `render`: ASCII board snapshots and algebraic notation
//! - `games`: Ready-made rule sets built on the engine

pub mod core;
pub mod expr;
pub mod games;
pub mod render;
pub mod rules;
pub mod spec;

// Re-export commonly used types
pub use crate::core::{
    Board, Entity, EntityId, EntitySchema, GameState, Player, PlayerId, Position, Value,
    ValueType,
};

pub use crate::expr::{evaluate, parse, Builtin, Context, EvalError, Expr, ParseError};

pub use crate::rules::{
    explain, is_applicable, validate_and_execute, ActionDef, AppliedMove, AppliedSegment,
    Condition, ConditionReport, EffectDef, GameFlow, MoveError, Phase, RuleSet,
};

pub use crate::spec::{setup::initialize, GameSpec, SpecError};

pub use crate::render::{asset_for_entity, format_position, parse_position, render_board};
