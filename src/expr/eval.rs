//! Expression evaluation.
//!
//! Evaluates a parsed expression tree against a `Context`: a borrowed game
//! state plus the per-attempt bindings (`entity`, `start`, `target`).
//! Evaluation is pure - there is no mutation path from here; only effect
//! execution (`rules::effect`) mutates state, and it does so through its own
//! API.
//!
//! ## Short-circuiting
//!
//! `and` and `or` evaluate their arguments lazily, left to right, and return
//! the first operand value that decides the result without coercing it to a
//! boolean. An argument after the deciding one is never evaluated, so
//! `and(false, <erroring>)` is `false`, not an error.
//!
//! ## Error softness
//!
//! Ill-typed data (`TypeMismatch`, `MissingAttribute`, `OffBoard`,
//! `DivisionByZero`) is an expected consequence of conditions written
//! against attributes that not every entity carries; the validator treats
//! those as a plain `false`. An unbound identifier is a specification
//! authoring bug and is surfaced instead.

use thiserror::Error;

use crate::core::{EntityId, GameState, Position, Value};

use super::ast::{Builtin, Expr};

/// Typed evaluation failure.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EvalError {
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("type mismatch: expected {expected}, got {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("no attribute '{name}' on {on}")]
    MissingAttribute { on: String, name: String },

    #[error("position {pos} is off the board")]
    OffBoard { pos: Position },

    #[error("division by zero")]
    DivisionByZero,
}

impl EvalError {
    fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        EvalError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Soft failures mean "this condition does not hold for this data";
    /// hard failures mean the specification itself is broken.
    #[must_use]
    pub fn is_soft(&self) -> bool {
        !matches!(self, EvalError::UnknownIdentifier(_))
    }
}

/// The evaluation environment for one validation or execution attempt.
///
/// Owns nothing long-lived: it borrows the state and carries a fixed set of
/// optional bindings. Built per attempt and discarded.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    /// The game state being read.
    pub state: &'a GameState,
    entity: Option<EntityId>,
    start: Option<Position>,
    target: Option<Position>,
}

impl<'a> Context<'a> {
    /// Context with no local bindings (setup expressions, global reads).
    #[must_use]
    pub fn new(state: &'a GameState) -> Self {
        Self {
            state,
            entity: None,
            start: None,
            target: None,
        }
    }

    /// Bind the acting entity.
    #[must_use]
    pub fn with_entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Bind the full segment: acting entity, start, and target positions.
    #[must_use]
    pub fn with_segment(mut self, entity: EntityId, start: Position, target: Position) -> Self {
        self.entity = Some(entity);
        self.start = Some(start);
        self.target = Some(target);
        self
    }
}

/// Evaluate an expression to a value.
pub fn evaluate(expr: &Expr, ctx: &Context) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        Expr::Ident(name) => match name.as_str() {
            "entity" => ctx
                .entity
                .map(Value::Entity)
                .ok_or_else(|| EvalError::UnknownIdentifier("entity".into())),
            "start" => ctx
                .start
                .map(Value::Pos)
                .ok_or_else(|| EvalError::UnknownIdentifier("start".into())),
            "target" => ctx
                .target
                .map(Value::Pos)
                .ok_or_else(|| EvalError::UnknownIdentifier("target".into())),
            // `state` and `board` are containers, only meaningful under a
            // property or index suffix.
            "state" => Err(EvalError::mismatch("state.<variable>", "bare 'state'")),
            "board" => Err(EvalError::mismatch("board[<position>]", "bare 'board'")),
            other => Err(EvalError::UnknownIdentifier(other.to_string())),
        },

        Expr::Property { base, field } => {
            if base.is_ident("state") {
                return ctx
                    .state
                    .global(field)
                    .cloned()
                    .ok_or_else(|| EvalError::MissingAttribute {
                        on: "state".into(),
                        name: field.clone(),
                    });
            }
            let value = evaluate(base, ctx)?;
            property_of(&value, field, ctx)
        }

        Expr::Index { base, key } => {
            if !base.is_ident("board") {
                return Err(EvalError::mismatch("board", base.kind()));
            }
            let key = evaluate(key, ctx)?;
            let pos = key
                .as_pos()
                .ok_or_else(|| EvalError::mismatch("position", key.type_name()))?;
            if !ctx.state.board.contains(pos) {
                return Err(EvalError::OffBoard { pos });
            }
            Ok(match ctx.state.board.occupant(pos) {
                Some(id) => Value::Entity(id),
                None => Value::Null,
            })
        }

        Expr::Call { builtin, args } => call(*builtin, args, ctx),
    }
}

/// Resolve `value.field`.
fn property_of(value: &Value, field: &str, ctx: &Context) -> Result<Value, EvalError> {
    match value {
        Value::Entity(id) => {
            let entity = ctx
                .state
                .entity(*id)
                .ok_or_else(|| EvalError::mismatch("live entity", "removed entity"))?;
            match field {
                "owner" => Ok(entity.owner.map_or(Value::Null, Value::Player)),
                "pos" => Ok(entity.pos.map_or(Value::Null, Value::Pos)),
                "schema" => Ok(Value::Str(entity.schema.clone())),
                _ => entity
                    .attribute(field)
                    .cloned()
                    .ok_or_else(|| EvalError::MissingAttribute {
                        on: entity.schema.clone(),
                        name: field.to_string(),
                    }),
            }
        }

        Value::Player(id) => {
            let player = ctx
                .state
                .player(*id)
                .ok_or_else(|| EvalError::UnknownIdentifier(format!("{id}")))?;
            match field {
                "name" => Ok(Value::Str(player.name.clone())),
                _ => player
                    .attribute(field)
                    .cloned()
                    .ok_or_else(|| EvalError::MissingAttribute {
                        on: player.name.clone(),
                        name: field.to_string(),
                    }),
            }
        }

        Value::Pos(pos) => match field {
            "x" => Ok(Value::Int(i64::from(pos.x))),
            "y" => Ok(Value::Int(i64::from(pos.y))),
            _ => Err(EvalError::MissingAttribute {
                on: "position".into(),
                name: field.to_string(),
            }),
        },

        other => Err(EvalError::mismatch(
            "entity, player, or position",
            other.type_name(),
        )),
    }
}

fn call(builtin: Builtin, args: &[Expr], ctx: &Context) -> Result<Value, EvalError> {
    match builtin {
        // === Comparison ===
        Builtin::Eq => {
            let (a, b) = (evaluate(&args[0], ctx)?, evaluate(&args[1], ctx)?);
            Ok(Value::Bool(a.loose_eq(&b)))
        }
        Builtin::Ne => {
            let (a, b) = (evaluate(&args[0], ctx)?, evaluate(&args[1], ctx)?);
            Ok(Value::Bool(!a.loose_eq(&b)))
        }
        Builtin::Gt => ordering(args, ctx, |o| o.is_gt()),
        Builtin::Lt => ordering(args, ctx, |o| o.is_lt()),
        Builtin::Ge => ordering(args, ctx, |o| o.is_ge()),
        Builtin::Le => ordering(args, ctx, |o| o.is_le()),

        // === Logic (lazy) ===
        Builtin::And => {
            let mut last = Value::Bool(true);
            for arg in args {
                let value = evaluate(arg, ctx)?;
                if !value.is_truthy() {
                    return Ok(value);
                }
                last = value;
            }
            Ok(last)
        }
        Builtin::Or => {
            let mut last = Value::Bool(false);
            for arg in args {
                let value = evaluate(arg, ctx)?;
                if value.is_truthy() {
                    return Ok(value);
                }
                last = value;
            }
            Ok(last)
        }
        Builtin::Not => {
            let value = evaluate(&args[0], ctx)?;
            Ok(Value::Bool(!value.is_truthy()))
        }

        // === Arithmetic ===
        Builtin::Abs => match evaluate(&args[0], ctx)? {
            Value::Int(i) => Ok(Value::Int(i.abs())),
            Value::Float(f) => Ok(Value::Float(f.abs())),
            other => Err(EvalError::mismatch("number", other.type_name())),
        },
        Builtin::Add => fold_numeric(args, ctx, |a, b| a + b, |a, b| a + b),
        Builtin::Mul => fold_numeric(args, ctx, |a, b| a * b, |a, b| a * b),
        Builtin::Sub => {
            let (a, b) = numeric_pair(args, ctx)?;
            Ok(match (a, b) {
                (Value::Int(a), Value::Int(b)) => Value::Int(a - b),
                (a, b) => Value::Float(float_of(&a) - float_of(&b)),
            })
        }
        Builtin::Div => {
            let (a, b) = numeric_pair(args, ctx)?;
            if float_of(&b) == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(match (a, b) {
                (Value::Int(a), Value::Int(b)) => Value::Int(a / b),
                (a, b) => Value::Float(float_of(&a) / float_of(&b)),
            })
        }

        // === Board and role helpers ===
        Builtin::MidPos => {
            let (a, b) = (position_arg(&args[0], ctx)?, position_arg(&args[1], ctx)?);
            // Componentwise average, rounded toward negative infinity.
            Ok(Value::Pos(Position::new(
                (a.x + b.x).div_euclid(2),
                (a.y + b.y).div_euclid(2),
            )))
        }
        Builtin::PathClear => {
            let (a, b) = (position_arg(&args[0], ctx)?, position_arg(&args[1], ctx)?);
            Ok(Value::Bool(ctx.state.board.path_clear(a, b)))
        }
        Builtin::OtherPlayer => {
            let value = evaluate(&args[0], ctx)?;
            let id = value
                .as_player()
                .ok_or_else(|| EvalError::mismatch("player", value.type_name()))?;
            if ctx.state.player_count() != 2 {
                return Err(EvalError::mismatch(
                    "exactly two roles",
                    format!("{} roles", ctx.state.player_count()),
                ));
            }
            if ctx.state.player(id).is_none() {
                return Err(EvalError::UnknownIdentifier(format!("{id}")));
            }
            let other = ctx
                .state
                .players()
                .iter()
                .find(|p| p.id != id)
                .expect("two-player roster always has another role");
            Ok(Value::Player(other.id))
        }
        Builtin::PlayerLookup => {
            let value = evaluate(&args[0], ctx)?;
            let name = value
                .as_str()
                .ok_or_else(|| EvalError::mismatch("string", value.type_name()))?;
            ctx.state
                .player_by_name(name)
                .map(|p| Value::Player(p.id))
                .ok_or_else(|| EvalError::UnknownIdentifier(name.to_string()))
        }
    }
}

fn float_of(v: &Value) -> f64 {
    v.as_float().expect("checked numeric")
}

fn numeric_pair(args: &[Expr], ctx: &Context) -> Result<(Value, Value), EvalError> {
    let a = evaluate(&args[0], ctx)?;
    let b = evaluate(&args[1], ctx)?;
    for v in [&a, &b] {
        if v.as_float().is_none() {
            return Err(EvalError::mismatch("number", v.type_name()));
        }
    }
    Ok((a, b))
}

fn fold_numeric(
    args: &[Expr],
    ctx: &Context,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    let mut acc = evaluate(&args[0], ctx)?;
    if acc.as_float().is_none() {
        return Err(EvalError::mismatch("number", acc.type_name()));
    }
    for arg in &args[1..] {
        let value = evaluate(arg, ctx)?;
        acc = match (&acc, &value) {
            (Value::Int(a), Value::Int(b)) => Value::Int(int_op(*a, *b)),
            (_, v) if v.as_float().is_none() => {
                return Err(EvalError::mismatch("number", v.type_name()))
            }
            (a, b) => Value::Float(float_op(float_of(a), float_of(b))),
        };
    }
    Ok(acc)
}

fn ordering(
    args: &[Expr],
    ctx: &Context,
    check: fn(std::cmp::Ordering) -> bool,
) -> Result<Value, EvalError> {
    let a = evaluate(&args[0], ctx)?;
    let b = evaluate(&args[1], ctx)?;
    let ord = a.numeric_cmp(&b).ok_or_else(|| {
        let not_numeric = if a.as_float().is_none() { &a } else { &b };
        EvalError::mismatch("number", not_numeric.type_name())
    })?;
    Ok(Value::Bool(check(ord)))
}

fn position_arg(arg: &Expr, ctx: &Context) -> Result<Position, EvalError> {
    let value = evaluate(arg, ctx)?;
    value
        .as_pos()
        .ok_or_else(|| EvalError::mismatch("position", value.type_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Board, Player, PlayerId};
    use crate::expr::parser::parse;
    use rustc_hash::FxHashMap;

    fn state() -> GameState {
        let players = vec![
            Player::new(PlayerId::new(0), "White")
                .with_attribute("pawn_direction", 1i64)
                .with_attribute("promotion_row", 7i64),
            Player::new(PlayerId::new(1), "Black")
                .with_attribute("pawn_direction", -1i64)
                .with_attribute("promotion_row", 0i64),
        ];
        GameState::new(players, Board::new(8, 8))
    }

    fn eval_str(src: &str, ctx: &Context) -> Result<Value, EvalError> {
        evaluate(&parse(src).unwrap(), ctx)
    }

    #[test]
    fn test_literal_and_arithmetic() {
        let state = state();
        let ctx = Context::new(&state);

        assert_eq!(eval_str("add(1, 2, 3)", &ctx), Ok(Value::Int(6)));
        assert_eq!(eval_str("sub(2, 5)", &ctx), Ok(Value::Int(-3)));
        assert_eq!(eval_str("mul(2, 3, 4)", &ctx), Ok(Value::Int(24)));
        assert_eq!(eval_str("abs(-4)", &ctx), Ok(Value::Int(4)));
        assert_eq!(eval_str("add(1, 0.5)", &ctx), Ok(Value::Float(1.5)));
        assert_eq!(eval_str("div(7, 2)", &ctx), Ok(Value::Int(3)));
        assert_eq!(eval_str("div(1, 0)", &ctx), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_comparisons() {
        let state = state();
        let ctx = Context::new(&state);

        assert_eq!(eval_str("eq(2, 2)", &ctx), Ok(Value::Bool(true)));
        assert_eq!(eval_str("eq(2, 2.0)", &ctx), Ok(Value::Bool(true)));
        assert_eq!(eval_str("ne('man', 'king')", &ctx), Ok(Value::Bool(true)));
        assert_eq!(eval_str("gt(3, 2)", &ctx), Ok(Value::Bool(true)));
        assert_eq!(eval_str("le(2, 2)", &ctx), Ok(Value::Bool(true)));
        assert!(matches!(
            eval_str("gt('a', 2)", &ctx),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_and_or_return_deciding_operand() {
        let state = state();
        let ctx = Context::new(&state);

        assert_eq!(eval_str("and(1, null, 2)", &ctx), Ok(Value::Null));
        assert_eq!(eval_str("and(1, 'x')", &ctx), Ok(Value::Str("x".into())));
        assert_eq!(eval_str("or(null, 0, 7)", &ctx), Ok(Value::Int(7)));
        assert_eq!(eval_str("or(null, 0)", &ctx), Ok(Value::Int(0)));
        assert_eq!(eval_str("not(null)", &ctx), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_short_circuit_skips_errors() {
        let state = state();
        let ctx = Context::new(&state);

        // The erroring argument is never reached.
        assert_eq!(
            eval_str("and(false, div(1, 0))", &ctx),
            Ok(Value::Bool(false))
        );
        assert_eq!(eval_str("or(true, div(1, 0))", &ctx), Ok(Value::Bool(true)));

        // Reached errors still propagate.
        assert_eq!(
            eval_str("and(true, div(1, 0))", &ctx),
            Err(EvalError::DivisionByZero)
        );
        assert_eq!(
            eval_str("or(false, div(1, 0))", &ctx),
            Err(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn test_bindings_and_property_chains() {
        let mut state = state();
        let start = Position::new(3, 1);
        let id = state.spawn(
            "Piece",
            Some(PlayerId::new(0)),
            Some(start),
            FxHashMap::default(),
        );
        let ctx = Context::new(&state).with_segment(id, start, Position::new(3, 3));

        assert_eq!(eval_str("start.y", &ctx), Ok(Value::Int(1)));
        assert_eq!(eval_str("target.y", &ctx), Ok(Value::Int(3)));
        assert_eq!(eval_str("entity.schema", &ctx), Ok(Value::Str("Piece".into())));
        assert_eq!(
            eval_str("entity.owner.pawn_direction", &ctx),
            Ok(Value::Int(1))
        );
        assert_eq!(eval_str("entity.owner.name", &ctx), Ok(Value::Str("White".into())));
        assert_eq!(
            eval_str("sub(target.y, start.y)", &ctx),
            Ok(Value::Int(2))
        );
    }

    #[test]
    fn test_unbound_identifier_is_hard() {
        let state = state();
        let ctx = Context::new(&state);

        let err = eval_str("entity.rank", &ctx).unwrap_err();
        assert_eq!(err, EvalError::UnknownIdentifier("entity".into()));
        assert!(!err.is_soft());

        let err = eval_str("mystery", &ctx).unwrap_err();
        assert_eq!(err, EvalError::UnknownIdentifier("mystery".into()));
    }

    #[test]
    fn test_missing_attribute_is_soft() {
        let mut state = state();
        let id = state.spawn("Piece", None, Some(Position::new(0, 0)), FxHashMap::default());
        let ctx = Context::new(&state).with_entity(id);

        let err = eval_str("entity.rank", &ctx).unwrap_err();
        assert_eq!(
            err,
            EvalError::MissingAttribute {
                on: "Piece".into(),
                name: "rank".into()
            }
        );
        assert!(err.is_soft());
    }

    #[test]
    fn test_board_indexing() {
        let mut state = state();
        let pos = Position::new(2, 2);
        let id = state.spawn("Piece", None, Some(pos), FxHashMap::default());
        let ctx = Context::new(&state)
            .with_segment(id, pos, Position::new(3, 3));

        assert_eq!(eval_str("board[start]", &ctx), Ok(Value::Entity(id)));
        assert_eq!(eval_str("board[target]", &ctx), Ok(Value::Null));
        assert_eq!(eval_str("eq(board[target], null)", &ctx), Ok(Value::Bool(true)));
        assert_eq!(eval_str("board[start].owner", &ctx), Ok(Value::Null));

        let at_mid = eval_str("board[mid_pos(start, start)]", &ctx);
        assert_eq!(at_mid, Ok(Value::Entity(id)));
    }

    #[test]
    fn test_off_board_index_is_soft_error() {
        let mut state = state();
        let pos = Position::new(7, 7);
        let id = state.spawn("Piece", None, Some(pos), FxHashMap::default());
        let ctx = Context::new(&state).with_segment(id, pos, Position::new(8, 8));

        let err = eval_str("board[target]", &ctx).unwrap_err();
        assert_eq!(err, EvalError::OffBoard { pos: Position::new(8, 8) });
        assert!(err.is_soft());
    }

    #[test]
    fn test_mid_pos_floors() {
        let mut state = state();
        let id = state.spawn("Piece", None, Some(Position::new(2, 3)), FxHashMap::default());
        let ctx = Context::new(&state).with_segment(id, Position::new(2, 3), Position::new(4, 5));

        assert_eq!(
            eval_str("mid_pos(start, target)", &ctx),
            Ok(Value::Pos(Position::new(3, 4)))
        );
    }

    #[test]
    fn test_state_globals() {
        let mut state = state();
        state.set_global("turn_count", Value::Int(3));
        let ctx = Context::new(&state);

        assert_eq!(eval_str("state.turn_count", &ctx), Ok(Value::Int(3)));
        assert!(matches!(
            eval_str("state.missing", &ctx),
            Err(EvalError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn test_player_lookup_and_other_player() {
        let state = state();
        let ctx = Context::new(&state);

        assert_eq!(
            eval_str("player('White')", &ctx),
            Ok(Value::Player(PlayerId::new(0)))
        );
        assert_eq!(
            eval_str("other_player(player('White'))", &ctx),
            Ok(Value::Player(PlayerId::new(1)))
        );
        assert_eq!(
            eval_str("player('Green')", &ctx),
            Err(EvalError::UnknownIdentifier("Green".into()))
        );
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let mut state = state();
        let pos = Position::new(1, 1);
        let id = state.spawn("Piece", Some(PlayerId::new(0)), Some(pos), FxHashMap::default());
        let ctx = Context::new(&state).with_segment(id, pos, Position::new(2, 2));

        let expr = parse("and(eq(board[target], null), eq(entity.owner, player('White')))").unwrap();
        let first = evaluate(&expr, &ctx);
        let second = evaluate(&expr, &ctx);
        assert_eq!(first, second);
        assert_eq!(first, Ok(Value::Bool(true)));
    }
}
