//! Effect execution.
//!
//! This is the engine's only mutation path: condition evaluation reads
//! through `expr::eval` and cannot touch state, while the functions here
//! take `&mut GameState` and overwrite the location a `Place` names.
//!
//! Effects run strictly in declared order; each one evaluates its
//! sub-expressions against the state as mutated by all prior effects of the
//! same action.

use tracing::trace;

use crate::core::{EntityId, GameState, Position, Value};
use crate::expr::{evaluate, Context, EvalError, Expr};

use super::action::{EffectDef, Place};

/// Execute one effect for the segment bound to `entity`/`start`/`target`.
///
/// An error here after an action was selected is a specification bug; the
/// validator discards the working state, so the caller never observes a
/// partial write.
pub fn apply(
    state: &mut GameState,
    effect: &EffectDef,
    entity: EntityId,
    start: Position,
    target: Position,
) -> Result<(), EvalError> {
    match effect {
        EffectDef::Set { place, value } => {
            let new_value = eval_in(state, value, entity, start, target)?;
            assign(state, place, new_value, entity, start, target)
        }

        EffectDef::RemoveEntity(expr) => {
            let value = eval_in(state, expr, entity, start, target)?;
            let id = value
                .as_entity()
                .ok_or_else(|| mismatch("entity", &value))?;
            trace!(%id, "remove entity");
            state.remove_entity(id);
            Ok(())
        }

        EffectDef::If { guard, effect } => {
            match eval_in(state, guard, entity, start, target) {
                Ok(value) if value.is_truthy() => apply(state, effect, entity, start, target),
                Ok(_) => Ok(()),
                // A guard probing an attribute the entity does not carry is
                // an unsatisfied condition, not a broken specification.
                Err(err) if err.is_soft() => Ok(()),
                Err(err) => Err(err),
            }
        }
    }
}

/// Execute an action's effects in declared order.
pub fn apply_all(
    state: &mut GameState,
    effects: &[EffectDef],
    entity: EntityId,
    start: Position,
    target: Position,
) -> Result<(), EvalError> {
    for effect in effects {
        apply(state, effect, entity, start, target)?;
    }
    Ok(())
}

fn eval_in(
    state: &GameState,
    expr: &Expr,
    entity: EntityId,
    start: Position,
    target: Position,
) -> Result<Value, EvalError> {
    let ctx = Context::new(state).with_segment(entity, start, target);
    evaluate(expr, &ctx)
}

fn assign(
    state: &mut GameState,
    place: &Place,
    value: Value,
    entity: EntityId,
    start: Position,
    target: Position,
) -> Result<(), EvalError> {
    match place {
        Place::BoardCell(key) => {
            let key = eval_in(state, key, entity, start, target)?;
            let pos = key.as_pos().ok_or_else(|| mismatch("position", &key))?;
            if !state.board.contains(pos) {
                return Err(EvalError::OffBoard { pos });
            }
            match value {
                Value::Null => {
                    trace!(%pos, "clear board cell");
                    state.board.clear(pos);
                }
                Value::Entity(id) => {
                    trace!(%pos, %id, "occupy board cell");
                    state.board.place(pos, id);
                }
                other => return Err(mismatch("entity or null", &other)),
            }
            Ok(())
        }

        Place::Attribute { base, field } => {
            let owner = eval_in(state, base, entity, start, target)?;
            match owner {
                Value::Entity(id) => {
                    let target_entity = state
                        .entity_mut(id)
                        .ok_or_else(|| EvalError::TypeMismatch {
                            expected: "live entity".into(),
                            found: "removed entity".into(),
                        })?;
                    trace!(%id, field = %field, %value, "set entity attribute");
                    match field.as_str() {
                        "pos" => {
                            target_entity.pos = match value {
                                Value::Pos(p) => Some(p),
                                Value::Null => None,
                                other => return Err(mismatch("position or null", &other)),
                            };
                        }
                        "owner" => {
                            target_entity.owner = match value {
                                Value::Player(p) => Some(p),
                                Value::Null => None,
                                other => return Err(mismatch("player or null", &other)),
                            };
                        }
                        "schema" => match value {
                            Value::Str(s) => target_entity.schema = s,
                            other => return Err(mismatch("string", &other)),
                        },
                        _ => target_entity.set_attribute(field.clone(), value),
                    }
                    Ok(())
                }

                Value::Player(id) => {
                    if field == "name" {
                        return Err(EvalError::TypeMismatch {
                            expected: "a mutable attribute".into(),
                            found: "role name".into(),
                        });
                    }
                    let player = state
                        .player_mut(id)
                        .ok_or_else(|| EvalError::UnknownIdentifier(format!("{id}")))?;
                    trace!(%id, field = %field, %value, "set player attribute");
                    player.attributes.insert(field.clone(), value);
                    Ok(())
                }

                other => Err(mismatch("entity or player", &other)),
            }
        }

        Place::Global(name) => {
            trace!(name = %name, %value, "set global");
            state.set_global(name.clone(), value);
            Ok(())
        }
    }
}

fn mismatch(expected: &str, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        expected: expected.into(),
        found: found.type_name().into(),
    }
}
