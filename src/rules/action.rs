//! Action definitions: conditions, effects, and the rule set.
//!
//! An action is a named, ordered pair of condition and effect lists plus a
//! chainability flag. Everything is compiled from expression text at load
//! time - conditions keep their source text so traces can show exactly what
//! the specification said.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::expr::parser::{parse, ParseError, Parser};
use crate::expr::Expr;

/// A pure boolean-valued expression gating an action's applicability.
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    source: String,
    expr: Expr,
}

impl Condition {
    /// Compile condition text. Fails the load on malformed input.
    pub fn compile(source: impl Into<String>) -> Result<Self, ParseError> {
        let source = source.into();
        let expr = parse(&source)?;
        Ok(Self { source, expr })
    }

    /// The condition exactly as written in the specification.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compiled expression tree.
    #[must_use]
    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

/// An assignable location, classified at load time.
#[derive(Clone, Debug, PartialEq)]
pub enum Place {
    /// A board cell: `board[<position expression>]`.
    BoardCell(Expr),

    /// A field on an entity or player: `entity.rank`, `entity.owner.score`.
    Attribute { base: Expr, field: String },

    /// A global state variable: `state.current_player`.
    Global(String),
}

impl Place {
    /// Classify an expression as an assignable location.
    fn from_expr(expr: Expr) -> Result<Self, ParseError> {
        match expr {
            Expr::Index { base, key } if base.is_ident("board") => Ok(Place::BoardCell(*key)),
            Expr::Property { base, field } if base.is_ident("state") => Ok(Place::Global(field)),
            Expr::Property { base, field } => Ok(Place::Attribute { base: *base, field }),
            other => Err(ParseError::NotAssignable {
                found: other.kind(),
            }),
        }
    }
}

/// A mutating expression, compiled at load time.
///
/// Effects are evaluated for their side effect on the game state, strictly
/// in declared order, each observing the mutations of all prior effects in
/// the same action.
#[derive(Clone, Debug, PartialEq)]
pub enum EffectDef {
    /// `set(place, value)` - overwrite an assignable location.
    Set { place: Place, value: Expr },

    /// `remove_entity(e)` - delete a live entity and sweep its board cells.
    RemoveEntity(Expr),

    /// `if(guard, effect)` - run the inner effect only when the pure guard
    /// holds.
    If {
        guard: Expr,
        effect: Box<EffectDef>,
    },
}

impl EffectDef {
    /// Compile effect text. Fails the load on malformed input.
    pub fn compile(source: &str) -> Result<Self, ParseError> {
        let mut parser = Parser::new(source);
        let effect = Self::parse_with(&mut parser)?;
        parser.expect_end()?;
        Ok(effect)
    }

    fn parse_with(parser: &mut Parser) -> Result<Self, ParseError> {
        parser.skip_ws();
        let head = parser.parse_ident()?;
        parser.expect('(')?;
        match head.as_str() {
            "set" => {
                let place_expr = parser.parse_expr()?;
                parser.expect(',')?;
                let value = parser.parse_expr()?;
                parser.expect(')')?;
                Ok(EffectDef::Set {
                    place: Place::from_expr(place_expr)?,
                    value,
                })
            }
            "remove_entity" => {
                let target = parser.parse_expr()?;
                parser.expect(')')?;
                Ok(EffectDef::RemoveEntity(target))
            }
            "if" => {
                let guard = parser.parse_expr()?;
                parser.expect(',')?;
                let effect = Self::parse_with(parser)?;
                parser.expect(')')?;
                Ok(EffectDef::If {
                    guard,
                    effect: Box::new(effect),
                })
            }
            _ => Err(ParseError::UnknownEffect { name: head }),
        }
    }
}

/// A named interaction: ordered conditions, ordered effects, chainability.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionDef {
    /// Action name as referenced by phases.
    pub name: String,

    /// Conditions, evaluated in declared order with short-circuiting.
    pub conditions: Vec<Condition>,

    /// Effects, executed in declared order once the action is selected.
    pub effects: Vec<EffectDef>,

    /// Whether this action may serve as a non-final segment of a
    /// multi-step move.
    pub chainable: bool,
}

impl ActionDef {
    /// Create an action with no conditions or effects.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            conditions: Vec::new(),
            effects: Vec::new(),
            chainable: false,
        }
    }

    /// Append a condition from source text, builder style.
    pub fn with_condition(mut self, source: &str) -> Result<Self, ParseError> {
        self.conditions.push(Condition::compile(source)?);
        Ok(self)
    }

    /// Append an effect from source text, builder style.
    pub fn with_effect(mut self, source: &str) -> Result<Self, ParseError> {
        self.effects.push(EffectDef::compile(source)?);
        Ok(self)
    }

    /// Mark this action as chainable.
    #[must_use]
    pub fn chainable(mut self) -> Self {
        self.chainable = true;
        self
    }
}

/// A phase: the ordered list of action names legal while it is active.
///
/// Order is the rule-precedence mechanism: the validator selects the first
/// applicable name, so listing a capture before a plain move makes capture
/// mandatory whenever it applies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    /// Allowed action names, most preferred first.
    pub allowed_actions: Vec<String>,
}

/// Phase structure: which actions are available when.
#[derive(Clone, Debug, PartialEq)]
pub struct GameFlow {
    /// Phase the game starts in.
    pub initial_phase: String,

    /// Phases by name.
    pub phases: FxHashMap<String, Phase>,
}

impl GameFlow {
    /// A flow with a single phase, the common case for simple games.
    pub fn single_phase(name: impl Into<String>, allowed_actions: Vec<String>) -> Self {
        let name = name.into();
        let mut phases = FxHashMap::default();
        phases.insert(
            name.clone(),
            Phase { allowed_actions },
        );
        Self {
            initial_phase: name,
            phases,
        }
    }
}

/// The complete compiled rule set of one game specification.
///
/// Read-only after load; the validator borrows it per attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleSet {
    actions: FxHashMap<String, ActionDef>,

    /// Phase structure.
    pub flow: GameFlow,
}

impl RuleSet {
    /// Assemble a rule set from actions and a flow.
    #[must_use]
    pub fn new(actions: Vec<ActionDef>, flow: GameFlow) -> Self {
        Self {
            actions: actions.into_iter().map(|a| (a.name.clone(), a)).collect(),
            flow,
        }
    }

    /// Look up an action definition by name.
    #[must_use]
    pub fn action(&self, name: &str) -> Option<&ActionDef> {
        self.actions.get(name)
    }

    /// Allowed action names for a phase, in precedence order.
    #[must_use]
    pub fn allowed_actions(&self, phase: &str) -> &[String] {
        self.flow
            .phases
            .get(phase)
            .map_or(&[], |p| p.allowed_actions.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_keeps_source() {
        let cond = Condition::compile("eq(board[target], null)").unwrap();
        assert_eq!(cond.source(), "eq(board[target], null)");
    }

    #[test]
    fn test_condition_rejects_malformed_text() {
        assert!(Condition::compile("eq(board[target], null").is_err());
        assert!(Condition::compile("frobnicate(1)").is_err());
    }

    #[test]
    fn test_effect_set_board_cell() {
        let effect = EffectDef::compile("set(board[target], entity)").unwrap();
        match effect {
            EffectDef::Set {
                place: Place::BoardCell(key),
                value,
            } => {
                assert!(key.is_ident("target"));
                assert!(value.is_ident("entity"));
            }
            other => panic!("Expected board-cell set, got {other:?}"),
        }
    }

    #[test]
    fn test_effect_set_attribute_and_global() {
        let effect = EffectDef::compile("set(entity.rank, 'king')").unwrap();
        assert!(matches!(
            effect,
            EffectDef::Set {
                place: Place::Attribute { .. },
                ..
            }
        ));

        let effect = EffectDef::compile("set(state.current_player, other_player(state.current_player))")
            .unwrap();
        assert!(matches!(
            effect,
            EffectDef::Set {
                place: Place::Global(ref name),
                ..
            } if name == "current_player"
        ));
    }

    #[test]
    fn test_effect_nested_if() {
        let effect =
            EffectDef::compile("if(eq(target.y, 7), set(entity.rank, 'queen'))").unwrap();
        match effect {
            EffectDef::If { effect, .. } => {
                assert!(matches!(*effect, EffectDef::Set { .. }));
            }
            other => panic!("Expected conditional effect, got {other:?}"),
        }
    }

    #[test]
    fn test_effect_rejects_unassignable_place() {
        assert_eq!(
            EffectDef::compile("set(5, 6)"),
            Err(ParseError::NotAssignable { found: "literal" })
        );
        assert!(matches!(
            EffectDef::compile("set(mid_pos(start, target), entity)"),
            Err(ParseError::NotAssignable { .. })
        ));
    }

    #[test]
    fn test_effect_rejects_unknown_head() {
        assert_eq!(
            EffectDef::compile("teleport(entity, target)"),
            Err(ParseError::UnknownEffect {
                name: "teleport".into()
            })
        );
    }

    #[test]
    fn test_action_builder() {
        let action = ActionDef::new("jump")
            .with_condition("eq(board[target], null)")
            .unwrap()
            .with_effect("set(board[target], entity)")
            .unwrap()
            .chainable();

        assert_eq!(action.name, "jump");
        assert_eq!(action.conditions.len(), 1);
        assert_eq!(action.effects.len(), 1);
        assert!(action.chainable);
    }

    #[test]
    fn test_rule_set_lookup_and_order() {
        let rules = RuleSet::new(
            vec![ActionDef::new("capture"), ActionDef::new("move")],
            GameFlow::single_phase("main", vec!["capture".into(), "move".into()]),
        );

        assert!(rules.action("capture").is_some());
        assert!(rules.action("castle").is_none());
        assert_eq!(rules.allowed_actions("main"), ["capture", "move"]);
        assert!(rules.allowed_actions("endgame").is_empty());
    }
}
