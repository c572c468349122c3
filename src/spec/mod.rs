//! Specification documents: loading and compilation.
//!
//! A game arrives as a JSON document describing players, board topology,
//! entity schemas, global state, setup steps, interactions, game flow, and
//! presentation profiles. Loading compiles every piece of expression text
//! up front - conditions, effects, initial values, asset conditions - so a
//! single malformed expression aborts the load and play never meets a parse
//! error.

pub mod setup;

use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use thiserror::Error;

use crate::core::{AttributeSpec, EntitySchema, Player, PlayerId, Position, Value, ValueType};
use crate::expr::{parse, Expr, ParseError};
use crate::rules::{ActionDef, Condition, GameFlow, Phase, RuleSet};

/// Failure to load or compile a specification. Fatal: there is no partial
/// load.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("failed to read specification: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed specification document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad expression in {context}: {source}")]
    Expression {
        context: String,
        #[source]
        source: ParseError,
    },

    #[error("unsupported topology '{0}'")]
    BadTopology(String),

    #[error("unsupported location '{0}'")]
    BadLocation(String),

    #[error("unsupported setup action '{0}'")]
    UnsupportedSetupAction(String),

    #[error("spawn step references unknown schema '{0}'")]
    UnknownSchema(String),

    #[error("phase '{phase}' allows unknown action '{action}'")]
    UnknownAction { phase: String, action: String },

    #[error("initial phase '{0}' is not defined")]
    UnknownInitialPhase(String),

    #[error("unsupported value for '{0}': only scalars are allowed")]
    UnsupportedValue(String),

    #[error("attribute '{attribute}' of '{owner}' does not match its declared type")]
    AttributeType { owner: String, attribute: String },

    #[error("setup failed evaluating {context}: {source}")]
    SetupEval {
        context: String,
        #[source]
        source: crate::expr::EvalError,
    },
}

// === Document model (raw JSON shape) ===

#[derive(Debug, Deserialize)]
pub struct SpecDoc {
    pub metadata: MetadataDoc,
    pub players: PlayersDoc,
    pub topology: TopologyDoc,
    #[serde(default)]
    pub entity_schemas: FxHashMap<String, SchemaDoc>,
    #[serde(default)]
    pub state_schema: StateSchemaDoc,
    #[serde(default)]
    pub setup: SetupDoc,
    pub interactions: InteractionsDoc,
    pub game_flow: GameFlowDoc,
    #[serde(default)]
    pub presentation: PresentationDoc,
}

#[derive(Debug, Deserialize)]
pub struct MetadataDoc {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlayersDoc {
    pub roles: Vec<RoleDoc>,
}

#[derive(Debug, Deserialize)]
pub struct RoleDoc {
    pub name: String,
    #[serde(default)]
    pub attributes: FxHashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct TopologyDoc {
    /// Board shape, e.g. `grid(8, 8)`.
    pub structure: String,
}

#[derive(Debug, Deserialize)]
pub struct SchemaDoc {
    #[serde(default)]
    pub attributes: FxHashMap<String, SchemaAttributeDoc>,
}

#[derive(Debug, Deserialize)]
pub struct SchemaAttributeDoc {
    #[serde(rename = "type")]
    pub ty: ValueType,
    #[serde(default)]
    pub default: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct StateSchemaDoc {
    #[serde(default)]
    pub global: FxHashMap<String, GlobalVarDoc>,
}

#[derive(Debug, Deserialize)]
pub struct GlobalVarDoc {
    #[serde(rename = "type", default)]
    pub ty: Option<ValueType>,
    /// Expression evaluated once during setup, e.g. `player('White')`.
    pub initial: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SetupDoc {
    #[serde(default)]
    pub steps: Vec<SetupStepDoc>,
}

#[derive(Debug, Deserialize)]
pub struct SetupStepDoc {
    pub action: String,
    pub schema: String,
    /// Location expressions, e.g. `grid_nodes(0, 0, 7, 1)`.
    #[serde(default)]
    pub at: Vec<String>,
    /// Attribute expressions evaluated per spawned entity.
    #[serde(default)]
    pub set_attributes: FxHashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct InteractionsDoc {
    pub list: FxHashMap<String, InteractionDoc>,
}

#[derive(Debug, Deserialize)]
pub struct InteractionDoc {
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub effects: Vec<String>,
    #[serde(default)]
    pub chainable: bool,
}

#[derive(Debug, Deserialize)]
pub struct GameFlowDoc {
    pub initial_phase: String,
    pub phases: FxHashMap<String, Phase>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PresentationDoc {
    #[serde(default)]
    pub profiles: FxHashMap<String, ProfileDoc>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileDoc {
    #[serde(default)]
    pub entity_assets: Vec<AssetDoc>,
    #[serde(default)]
    pub topology_assets: FxHashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct AssetDoc {
    pub conditions: String,
    pub asset: String,
}

// === Compiled specification ===

/// A global state variable with its compiled initial expression.
#[derive(Clone, Debug)]
pub struct GlobalVar {
    pub name: String,
    pub ty: Option<ValueType>,
    pub initial: Expr,
}

/// A compiled spawn step: one schema, expanded locations, attribute
/// expressions.
#[derive(Clone, Debug)]
pub struct SpawnStep {
    pub schema: String,
    pub locations: Vec<Position>,
    pub attributes: Vec<(String, Expr)>,
}

/// One display rule: first profile asset whose condition holds wins.
#[derive(Clone, Debug)]
pub struct EntityAsset {
    pub condition: Condition,
    pub asset: String,
}

/// A compiled presentation profile.
#[derive(Clone, Debug, Default)]
pub struct Profile {
    pub entity_assets: Vec<EntityAsset>,
    pub topology_assets: FxHashMap<String, String>,
}

/// A fully compiled game specification, read-only after load.
#[derive(Clone, Debug)]
pub struct GameSpec {
    pub name: String,
    pub grid: (i32, i32),
    pub players: Vec<Player>,
    pub schemas: FxHashMap<String, EntitySchema>,
    pub globals: Vec<GlobalVar>,
    pub setup: Vec<SpawnStep>,
    pub rules: RuleSet,
    pub profiles: FxHashMap<String, Profile>,
}

impl GameSpec {
    /// Load and compile a specification from JSON text.
    pub fn from_json(text: &str) -> Result<Self, SpecError> {
        let doc: SpecDoc = serde_json::from_str(text)?;
        compile(doc)
    }

    /// Load and compile a specification from a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SpecError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Look up a presentation profile.
    #[must_use]
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }
}

fn compile(doc: SpecDoc) -> Result<GameSpec, SpecError> {
    let grid = parse_grid(&doc.topology.structure)?;

    let mut players = Vec::with_capacity(doc.players.roles.len());
    for (index, role) in doc.players.roles.into_iter().enumerate() {
        let mut player = Player::new(PlayerId::new(index as u8), role.name);
        for (name, raw) in &role.attributes {
            player
                .attributes
                .insert(name.clone(), value_from_json(name, raw)?);
        }
        players.push(player);
    }

    let mut schemas = FxHashMap::default();
    for (name, schema_doc) in doc.entity_schemas {
        let mut schema = EntitySchema::new(name.clone());
        for (attr_name, attr) in schema_doc.attributes {
            let default = value_from_json(&attr_name, &attr.default)?;
            if !attr.ty.admits(&default) {
                return Err(SpecError::AttributeType {
                    owner: name.clone(),
                    attribute: attr_name,
                });
            }
            schema
                .attributes
                .insert(attr_name, AttributeSpec { ty: attr.ty, default });
        }
        schemas.insert(name, schema);
    }

    let mut globals = Vec::new();
    for (name, var) in doc.state_schema.global {
        let initial = parse(&var.initial).map_err(|source| SpecError::Expression {
            context: format!("state_schema.global.{name}.initial"),
            source,
        })?;
        globals.push(GlobalVar {
            name,
            ty: var.ty,
            initial,
        });
    }

    let mut setup = Vec::with_capacity(doc.setup.steps.len());
    for step in doc.setup.steps {
        if step.action != "spawn_entity" {
            return Err(SpecError::UnsupportedSetupAction(step.action));
        }
        if !schemas.contains_key(&step.schema) {
            return Err(SpecError::UnknownSchema(step.schema));
        }
        let mut locations = Vec::new();
        for loc in &step.at {
            locations.extend(parse_locations(loc)?);
        }
        let mut attributes = Vec::with_capacity(step.set_attributes.len());
        for (name, source_text) in step.set_attributes {
            let expr = parse(&source_text).map_err(|source| SpecError::Expression {
                context: format!("setup.set_attributes.{name}"),
                source,
            })?;
            attributes.push((name, expr));
        }
        setup.push(SpawnStep {
            schema: step.schema,
            locations,
            attributes,
        });
    }

    let mut actions = Vec::with_capacity(doc.interactions.list.len());
    for (name, interaction) in doc.interactions.list {
        let mut action = ActionDef::new(name.clone());
        action.chainable = interaction.chainable;
        for (i, text) in interaction.conditions.iter().enumerate() {
            action.conditions.push(Condition::compile(text.clone()).map_err(
                |source| SpecError::Expression {
                    context: format!("interactions.{name}.conditions[{i}]"),
                    source,
                },
            )?);
        }
        for (i, text) in interaction.effects.iter().enumerate() {
            action
                .effects
                .push(
                    crate::rules::EffectDef::compile(text).map_err(|source| {
                        SpecError::Expression {
                            context: format!("interactions.{name}.effects[{i}]"),
                            source,
                        }
                    })?,
                );
        }
        actions.push(action);
    }

    if !doc.game_flow.phases.contains_key(&doc.game_flow.initial_phase) {
        return Err(SpecError::UnknownInitialPhase(doc.game_flow.initial_phase));
    }
    let action_names: Vec<&str> = actions.iter().map(|a| a.name.as_str()).collect();
    for (phase_name, phase) in &doc.game_flow.phases {
        for allowed in &phase.allowed_actions {
            if !action_names.contains(&allowed.as_str()) {
                return Err(SpecError::UnknownAction {
                    phase: phase_name.clone(),
                    action: allowed.clone(),
                });
            }
        }
    }
    let rules = RuleSet::new(
        actions,
        GameFlow {
            initial_phase: doc.game_flow.initial_phase,
            phases: doc.game_flow.phases,
        },
    );

    let mut profiles = FxHashMap::default();
    for (profile_name, profile_doc) in doc.presentation.profiles {
        let mut profile = Profile {
            entity_assets: Vec::with_capacity(profile_doc.entity_assets.len()),
            topology_assets: profile_doc.topology_assets,
        };
        for (i, asset) in profile_doc.entity_assets.into_iter().enumerate() {
            let condition = Condition::compile(asset.conditions).map_err(|source| {
                SpecError::Expression {
                    context: format!("presentation.{profile_name}.entity_assets[{i}]"),
                    source,
                }
            })?;
            profile.entity_assets.push(EntityAsset {
                condition,
                asset: asset.asset,
            });
        }
        profiles.insert(profile_name, profile);
    }

    Ok(GameSpec {
        name: doc.metadata.name,
        grid,
        players,
        schemas,
        globals,
        setup,
        rules,
        profiles,
    })
}

/// Convert a JSON scalar into a runtime value.
fn value_from_json(name: &str, raw: &serde_json::Value) -> Result<Value, SpecError> {
    use serde_json::Value as Json;
    match raw {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Float(f))
            } else {
                Err(SpecError::UnsupportedValue(name.to_string()))
            }
        }
        Json::String(s) => Ok(Value::Str(s.clone())),
        Json::Array(_) | Json::Object(_) => Err(SpecError::UnsupportedValue(name.to_string())),
    }
}

/// Parse `grid(W, H)` into board dimensions.
fn parse_grid(structure: &str) -> Result<(i32, i32), SpecError> {
    let args = int_args(structure, "grid")
        .ok_or_else(|| SpecError::BadTopology(structure.to_string()))?;
    match args.as_slice() {
        [w, h] if *w > 0 && *h > 0 => Ok((*w, *h)),
        _ => Err(SpecError::BadTopology(structure.to_string())),
    }
}

/// Expand a location expression into concrete positions.
///
/// `grid_nodes(x1, y1, x2, y2)` covers the full inclusive rectangle.
fn parse_locations(text: &str) -> Result<Vec<Position>, SpecError> {
    let args =
        int_args(text, "grid_nodes").ok_or_else(|| SpecError::BadLocation(text.to_string()))?;
    let [x1, y1, x2, y2] = args.as_slice() else {
        return Err(SpecError::BadLocation(text.to_string()));
    };
    if x2 < x1 || y2 < y1 {
        return Err(SpecError::BadLocation(text.to_string()));
    }
    let mut positions = Vec::new();
    for y in *y1..=*y2 {
        for x in *x1..=*x2 {
            positions.push(Position::new(x, y));
        }
    }
    Ok(positions)
}

/// Parse `head(i, j, ...)` into its integer arguments.
fn int_args(text: &str, head: &str) -> Option<Vec<i32>> {
    let rest = text.trim().strip_prefix(head)?.trim_start();
    let inner = rest.strip_prefix('(')?.trim_end().strip_suffix(')')?;
    inner
        .split(',')
        .map(|part| part.trim().parse::<i32>().ok())
        .collect()
}
