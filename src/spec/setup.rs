//! Initial state construction.
//!
//! Builds the `GameState` a compiled specification describes: players,
//! board, global variables, and spawned entities. Global initial values and
//! spawn attributes are ordinary expressions evaluated against the state
//! under construction, so `player('White')` works anywhere a value is
//! expected.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::core::{Board, GameState, PlayerId, Value};
use crate::expr::{evaluate, Context};

use super::{GameSpec, SpecError};

/// Build the initial game state for a compiled specification.
pub fn initialize(spec: &GameSpec) -> Result<GameState, SpecError> {
    let (width, height) = spec.grid;
    let mut state = GameState::new(spec.players.clone(), Board::new(width, height));

    for var in &spec.globals {
        let value = evaluate(&var.initial, &Context::new(&state)).map_err(|source| {
            SpecError::SetupEval {
                context: format!("state_schema.global.{}", var.name),
                source,
            }
        })?;
        if let Some(ty) = var.ty {
            if !ty.admits(&value) {
                return Err(SpecError::AttributeType {
                    owner: "state".into(),
                    attribute: var.name.clone(),
                });
            }
        }
        state.set_global(var.name.clone(), value);
    }

    for (step_index, step) in spec.setup.iter().enumerate() {
        let schema = spec
            .schemas
            .get(&step.schema)
            .ok_or_else(|| SpecError::UnknownSchema(step.schema.clone()))?;

        // Attribute expressions do not depend on the spawn location, so one
        // evaluation covers every entity of the step.
        let mut attributes: FxHashMap<String, Value> = FxHashMap::default();
        for (name, expr) in &step.attributes {
            let value = evaluate(expr, &Context::new(&state)).map_err(|source| {
                SpecError::SetupEval {
                    context: format!("setup.steps[{step_index}].set_attributes.{name}"),
                    source,
                }
            })?;
            attributes.insert(name.clone(), value);
        }

        let owner = take_owner(&mut attributes, step_index)?;

        for (name, attr_spec) in &schema.attributes {
            let value = attributes
                .entry(name.clone())
                .or_insert_with(|| attr_spec.default.clone());
            if !attr_spec.ty.admits(value) {
                return Err(SpecError::AttributeType {
                    owner: schema.name.clone(),
                    attribute: name.clone(),
                });
            }
        }

        for &pos in &step.locations {
            if !state.board.contains(pos) {
                return Err(SpecError::BadLocation(format!(
                    "setup.steps[{step_index}] spawns at {pos}, outside the board"
                )));
            }
            state.spawn(step.schema.clone(), owner, Some(pos), attributes.clone());
        }
        debug!(
            schema = %step.schema,
            count = step.locations.len(),
            "spawned entities"
        );
    }

    debug!(entities = state.entity_count(), "setup complete");
    Ok(state)
}

/// Pull the special `owner` attribute out of a spawn step's bag.
fn take_owner(
    attributes: &mut FxHashMap<String, Value>,
    step_index: usize,
) -> Result<Option<PlayerId>, SpecError> {
    match attributes.remove("owner") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Player(id)) => Ok(Some(id)),
        Some(_) => Err(SpecError::AttributeType {
            owner: format!("setup.steps[{step_index}]"),
            attribute: "owner".into(),
        }),
    }
}
