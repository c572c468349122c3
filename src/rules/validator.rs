//! Move validation and execution.
//!
//! Validates a user-supplied path `p0 -> p1 -> ... -> pn` as a chain of
//! segments and, only when every segment validates, commits the result.
//!
//! ## Selection
//!
//! Per segment, the allowed action names are tried in order and the first
//! applicable one wins; later names are never evaluated. List order is how
//! specifications encode precedence (a capture listed before a plain move is
//! a mandatory capture).
//!
//! ## Simulate-then-commit
//!
//! Validation runs against a private working copy of the state (an O(1)
//! clone thanks to the `im`-backed arena). Each segment sees the cumulative
//! effects of the segments before it; the real state is overwritten only
//! after the whole path validates. A rejected attempt - including an effect
//! failure halfway through - leaves the caller's state untouched.

use thiserror::Error;
use tracing::{debug, trace};

use crate::core::{GameState, Position, Value};
use crate::expr::{evaluate, Context, EvalError};

use super::action::{ActionDef, RuleSet};
use super::effect;

/// One validated hop of a committed move.
#[derive(Clone, Debug, PartialEq)]
pub struct AppliedSegment {
    /// Name of the action selected for this hop.
    pub action: String,
    pub from: Position,
    pub to: Position,
}

/// A fully validated and committed move.
#[derive(Clone, Debug, PartialEq)]
pub struct AppliedMove {
    /// Selected action per segment, in path order.
    pub segments: Vec<AppliedSegment>,
}

/// Rejection of a move attempt. All variants are recoverable: the state is
/// unchanged and the caller can re-prompt.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum MoveError {
    #[error("a move needs at least a start and a target position")]
    PathTooShort,

    #[error("no entity at {pos} (segment {segment})")]
    UnknownEntityAtStart { segment: usize, pos: Position },

    #[error("no allowed action applies to segment {segment} (tried: {})", attempted.join(", "))]
    NoApplicableAction {
        segment: usize,
        attempted: Vec<String>,
    },

    #[error("action '{action}' cannot continue a multi-step move (segment {segment})")]
    NotChainable { segment: usize, action: String },

    #[error("condition of action '{action}' is broken: {source}")]
    BrokenCondition {
        action: String,
        #[source]
        source: EvalError,
    },

    #[error("effect of action '{action}' failed on segment {segment}: {source}")]
    EffectFailed {
        segment: usize,
        action: String,
        #[source]
        source: EvalError,
    },
}

/// Check a single action against a bound segment context.
///
/// Conditions are evaluated in declared order; the first one that is not
/// `true` stops evaluation of the rest. Ill-typed data (a soft error) means
/// the action simply does not apply; an unbound identifier propagates as a
/// specification bug.
pub fn is_applicable(action: &ActionDef, ctx: &Context) -> Result<bool, EvalError> {
    for condition in &action.conditions {
        match evaluate(condition.expr(), ctx) {
            Ok(Value::Bool(true)) => {
                trace!(action = %action.name, condition = %condition.source(), "condition holds");
            }
            Ok(value) => {
                trace!(
                    action = %action.name,
                    condition = %condition.source(),
                    %value,
                    "condition not met"
                );
                return Ok(false);
            }
            Err(err) if err.is_soft() => {
                trace!(
                    action = %action.name,
                    condition = %condition.source(),
                    error = %err,
                    "condition not met"
                );
                return Ok(false);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(true)
}

/// Validate a path against the allowed actions and, on success, commit all
/// effects to `state`.
///
/// `allowed` is the current phase's action-name list in precedence order.
/// Intermediate segments must select a chainable action; the final segment
/// may select any allowed action, and a single-segment move needs no
/// chainability at all.
pub fn validate_and_execute(
    state: &mut GameState,
    rules: &RuleSet,
    allowed: &[String],
    path: &[Position],
) -> Result<AppliedMove, MoveError> {
    if path.len() < 2 {
        return Err(MoveError::PathTooShort);
    }

    let mut sim = state.clone();
    let mut segments = Vec::with_capacity(path.len() - 1);
    let final_segment = path.len() - 2;

    for (i, pair) in path.windows(2).enumerate() {
        let (from, to) = (pair[0], pair[1]);
        let entity = sim
            .board
            .occupant(from)
            .ok_or(MoveError::UnknownEntityAtStart {
                segment: i,
                pos: from,
            })?;

        let selected = {
            let ctx = Context::new(&sim).with_segment(entity, from, to);
            let mut selected = None;
            for name in allowed {
                let Some(action) = rules.action(name) else {
                    debug!(action = %name, "allowed action missing from rule set");
                    continue;
                };
                match is_applicable(action, &ctx) {
                    Ok(true) => {
                        selected = Some(action);
                        break;
                    }
                    Ok(false) => {}
                    Err(source) => {
                        return Err(MoveError::BrokenCondition {
                            action: name.clone(),
                            source,
                        })
                    }
                }
            }
            selected
        };

        let action = selected.ok_or_else(|| MoveError::NoApplicableAction {
            segment: i,
            attempted: allowed.to_vec(),
        })?;

        if i < final_segment && !action.chainable {
            return Err(MoveError::NotChainable {
                segment: i,
                action: action.name.clone(),
            });
        }

        effect::apply_all(&mut sim, &action.effects, entity, from, to).map_err(|source| {
            MoveError::EffectFailed {
                segment: i,
                action: action.name.clone(),
                source,
            }
        })?;

        debug!(segment = i, action = %action.name, %from, %to, "segment validated");
        segments.push(AppliedSegment {
            action: action.name.clone(),
            from,
            to,
        });
    }

    *state = sim;
    Ok(AppliedMove { segments })
}

/// Outcome of one condition, for presentation and debugging.
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionReport {
    /// The condition exactly as written.
    pub source: String,
    /// Its value (or failure) in the given context.
    pub outcome: Result<Value, EvalError>,
}

/// Re-evaluate every condition of an action for display.
///
/// Unlike validation this does not short-circuit: a debug view wants the
/// verdict of each condition. Evaluation is pure, so this never changes
/// what the validator would decide.
#[must_use]
pub fn explain(action: &ActionDef, ctx: &Context) -> Vec<ConditionReport> {
    action
        .conditions
        .iter()
        .map(|condition| ConditionReport {
            source: condition.source().to_string(),
            outcome: evaluate(condition.expr(), ctx),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Board, Player, PlayerId};
    use crate::rules::action::{ActionDef, GameFlow};
    use rustc_hash::FxHashMap;

    fn pawn_rules() -> RuleSet {
        let step = ActionDef::new("step")
            .with_condition("eq(board[target], null)")
            .unwrap()
            .with_condition("eq(sub(target.y, start.y), entity.owner.pawn_direction)")
            .unwrap()
            .with_condition("eq(target.x, start.x)")
            .unwrap()
            .with_effect("set(board[target], entity)")
            .unwrap()
            .with_effect("set(board[start], null)")
            .unwrap()
            .with_effect("set(entity.pos, target)")
            .unwrap();

        RuleSet::new(
            vec![step],
            GameFlow::single_phase("main", vec!["step".into()]),
        )
    }

    fn pawn_state() -> (GameState, crate::core::EntityId) {
        let players = vec![
            Player::new(PlayerId::new(0), "White").with_attribute("pawn_direction", 1i64),
            Player::new(PlayerId::new(1), "Black").with_attribute("pawn_direction", -1i64),
        ];
        let mut state = GameState::new(players, Board::new(8, 8));
        let id = state.spawn(
            "Piece",
            Some(PlayerId::new(0)),
            Some(Position::new(3, 1)),
            FxHashMap::default(),
        );
        (state, id)
    }

    #[test]
    fn test_single_segment_commit() {
        let rules = pawn_rules();
        let (mut state, id) = pawn_state();

        let outcome = validate_and_execute(
            &mut state,
            &rules,
            &["step".to_string()],
            &[Position::new(3, 1), Position::new(3, 2)],
        )
        .unwrap();

        assert_eq!(outcome.segments.len(), 1);
        assert_eq!(outcome.segments[0].action, "step");
        assert_eq!(state.board.occupant(Position::new(3, 2)), Some(id));
        assert_eq!(state.board.occupant(Position::new(3, 1)), None);
        assert_eq!(state.entity(id).unwrap().pos, Some(Position::new(3, 2)));
    }

    #[test]
    fn test_rejection_leaves_state_untouched() {
        let rules = pawn_rules();
        let (mut state, _) = pawn_state();
        let before = state.clone();

        // Sideways is not a pawn step.
        let err = validate_and_execute(
            &mut state,
            &rules,
            &["step".to_string()],
            &[Position::new(3, 1), Position::new(4, 1)],
        )
        .unwrap_err();

        assert!(matches!(err, MoveError::NoApplicableAction { segment: 0, .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn test_empty_start_is_reported() {
        let rules = pawn_rules();
        let (mut state, _) = pawn_state();

        let err = validate_and_execute(
            &mut state,
            &rules,
            &["step".to_string()],
            &[Position::new(0, 0), Position::new(0, 1)],
        )
        .unwrap_err();

        assert_eq!(
            err,
            MoveError::UnknownEntityAtStart {
                segment: 0,
                pos: Position::new(0, 0)
            }
        );
    }

    #[test]
    fn test_too_short_path() {
        let rules = pawn_rules();
        let (mut state, _) = pawn_state();

        let err =
            validate_and_execute(&mut state, &rules, &["step".to_string()], &[Position::new(3, 1)])
                .unwrap_err();
        assert_eq!(err, MoveError::PathTooShort);
    }

    #[test]
    fn test_intermediate_segment_requires_chainable() {
        let rules = pawn_rules();
        let (mut state, _) = pawn_state();
        let before = state.clone();

        // Two step segments: the first is intermediate, and `step` is not
        // chainable.
        let err = validate_and_execute(
            &mut state,
            &rules,
            &["step".to_string()],
            &[Position::new(3, 1), Position::new(3, 2), Position::new(3, 3)],
        )
        .unwrap_err();

        assert_eq!(
            err,
            MoveError::NotChainable {
                segment: 0,
                action: "step".into()
            }
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_first_match_wins_and_shields_later_actions() {
        // `second` would hard-error if its conditions were ever evaluated.
        let first = ActionDef::new("first")
            .with_condition("eq(board[target], null)")
            .unwrap()
            .with_effect("set(board[target], entity)")
            .unwrap()
            .with_effect("set(board[start], null)")
            .unwrap()
            .with_effect("set(entity.pos, target)")
            .unwrap();
        let second = ActionDef::new("second")
            .with_condition("no_such_binding")
            .unwrap();
        let rules = RuleSet::new(
            vec![first, second],
            GameFlow::single_phase("main", vec!["first".into(), "second".into()]),
        );

        let (mut state, _) = pawn_state();
        let outcome = validate_and_execute(
            &mut state,
            &rules,
            &["first".to_string(), "second".to_string()],
            &[Position::new(3, 1), Position::new(3, 2)],
        )
        .unwrap();

        assert_eq!(outcome.segments[0].action, "first");
    }

    #[test]
    fn test_broken_condition_is_surfaced() {
        let broken = ActionDef::new("broken")
            .with_condition("no_such_binding")
            .unwrap();
        let rules = RuleSet::new(
            vec![broken],
            GameFlow::single_phase("main", vec!["broken".into()]),
        );

        let (mut state, _) = pawn_state();
        let before = state.clone();
        let err = validate_and_execute(
            &mut state,
            &rules,
            &["broken".to_string()],
            &[Position::new(3, 1), Position::new(3, 2)],
        )
        .unwrap_err();

        assert!(matches!(err, MoveError::BrokenCondition { .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn test_soft_condition_failure_means_not_applicable() {
        // `entity.rank` is missing on the pawn: soft failure, action skipped.
        let ranked = ActionDef::new("ranked")
            .with_condition("eq(entity.rank, 'king')")
            .unwrap();
        let rules = RuleSet::new(
            vec![ranked],
            GameFlow::single_phase("main", vec!["ranked".into()]),
        );

        let (mut state, _) = pawn_state();
        let err = validate_and_execute(
            &mut state,
            &rules,
            &["ranked".to_string()],
            &[Position::new(3, 1), Position::new(3, 2)],
        )
        .unwrap_err();

        assert!(matches!(err, MoveError::NoApplicableAction { .. }));
    }

    #[test]
    fn test_explain_reports_every_condition() {
        let rules = pawn_rules();
        let (state, id) = pawn_state();
        let ctx = Context::new(&state).with_segment(id, Position::new(3, 1), Position::new(4, 1));

        let reports = explain(rules.action("step").unwrap(), &ctx);
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].outcome, Ok(Value::Bool(true)));
        // Sideways: direction check fails but is still reported.
        assert_eq!(reports[1].outcome, Ok(Value::Bool(false)));
        assert_eq!(reports[2].outcome, Ok(Value::Bool(false)));
    }
}
