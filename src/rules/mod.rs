//! Rule definitions and the move validator.
//!
//! `action` holds the compiled form of a specification's interactions;
//! `effect` executes their mutations; `validator` drives single- and
//! multi-segment validation with simulate-then-commit semantics.

pub mod action;
pub mod effect;
pub mod validator;

pub use action::{ActionDef, Condition, EffectDef, GameFlow, Phase, Place, RuleSet};
pub use validator::{
    explain, is_applicable, validate_and_execute, AppliedMove, AppliedSegment, ConditionReport,
    MoveError,
};
