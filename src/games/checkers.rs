//! Checkers (draughts) as pure rule data.
//!
//! Demonstrates the precedence idiom: jumps are listed before plain moves
//! in the phase's action order, which makes capture mandatory whenever one
//! is available - no special-case code, just ordering. Jumps are chainable,
//! so multi-hop captures validate as a chain with each hop seeing the
//! previous hop's captures.

use rustc_hash::FxHashMap;

use crate::core::{Board, GameState, Player, PlayerId, Position, Value};
use crate::rules::{ActionDef, Condition, EffectDef, GameFlow, RuleSet};

fn action(name: &str, chainable: bool, conditions: &[&str], effects: &[&str]) -> ActionDef {
    let mut action = ActionDef::new(name);
    action.chainable = chainable;
    for text in conditions {
        action
            .conditions
            .push(Condition::compile(*text).expect("checkers condition is well-formed"));
    }
    for text in effects {
        action
            .effects
            .push(EffectDef::compile(text).expect("checkers effect is well-formed"));
    }
    action
}

/// Build the checkers rule set.
///
/// Action order in the `main` phase: man jump, king jump, man move, king
/// move.
#[must_use]
pub fn rules() -> RuleSet {
    let man_jump = action(
        "man_jump",
        true,
        &[
            "eq(entity.owner, state.current_player)",
            "eq(entity.rank, 'man')",
            "eq(board[target], null)",
            "eq(abs(sub(target.x, start.x)), 2)",
            "eq(sub(target.y, start.y), mul(2, entity.owner.direction))",
            "ne(board[mid_pos(start, target)], null)",
            "eq(board[mid_pos(start, target)].owner, other_player(entity.owner))",
        ],
        &[
            "remove_entity(board[mid_pos(start, target)])",
            "set(board[start], null)",
            "set(board[target], entity)",
            "set(entity.pos, target)",
            "if(eq(target.y, entity.owner.king_row), set(entity.rank, 'king'))",
        ],
    );

    let king_jump = action(
        "king_jump",
        true,
        &[
            "eq(entity.owner, state.current_player)",
            "eq(entity.rank, 'king')",
            "eq(board[target], null)",
            "eq(abs(sub(target.x, start.x)), 2)",
            "eq(abs(sub(target.y, start.y)), 2)",
            "ne(board[mid_pos(start, target)], null)",
            "eq(board[mid_pos(start, target)].owner, other_player(entity.owner))",
        ],
        &[
            "remove_entity(board[mid_pos(start, target)])",
            "set(board[start], null)",
            "set(board[target], entity)",
            "set(entity.pos, target)",
        ],
    );

    let man_move = action(
        "man_move",
        false,
        &[
            "eq(entity.owner, state.current_player)",
            "eq(entity.rank, 'man')",
            "eq(board[target], null)",
            "eq(abs(sub(target.x, start.x)), 1)",
            "eq(sub(target.y, start.y), entity.owner.direction)",
        ],
        &[
            "set(board[start], null)",
            "set(board[target], entity)",
            "set(entity.pos, target)",
            "if(eq(target.y, entity.owner.king_row), set(entity.rank, 'king'))",
        ],
    );

    let king_move = action(
        "king_move",
        false,
        &[
            "eq(entity.owner, state.current_player)",
            "eq(entity.rank, 'king')",
            "eq(board[target], null)",
            "eq(abs(sub(target.x, start.x)), 1)",
            "eq(abs(sub(target.y, start.y)), 1)",
        ],
        &[
            "set(board[start], null)",
            "set(board[target], entity)",
            "set(entity.pos, target)",
        ],
    );

    RuleSet::new(
        vec![man_jump, king_jump, man_move, king_move],
        GameFlow::single_phase(
            "main",
            vec![
                "man_jump".into(),
                "king_jump".into(),
                "man_move".into(),
                "king_move".into(),
            ],
        ),
    )
}

/// Standard starting position: men on the dark squares of the first three
/// ranks on each side, Red to move.
#[must_use]
pub fn initial_state() -> GameState {
    let red = PlayerId::new(0);
    let black = PlayerId::new(1);
    let players = vec![
        Player::new(red, "Red")
            .with_attribute("direction", 1i64)
            .with_attribute("king_row", 7i64),
        Player::new(black, "Black")
            .with_attribute("direction", -1i64)
            .with_attribute("king_row", 0i64),
    ];

    let mut state = GameState::new(players, Board::new(8, 8));
    for y in 0..8 {
        let owner = match y {
            0..=2 => Some(red),
            5..=7 => Some(black),
            _ => None,
        };
        let Some(owner) = owner else { continue };
        for x in 0..8 {
            if (x + y) % 2 != 1 {
                continue;
            }
            let mut attributes = FxHashMap::default();
            attributes.insert("rank".to_string(), Value::Str("man".into()));
            state.spawn("Piece", Some(owner), Some(Position::new(x, y)), attributes);
        }
    }
    state.set_global("current_player", Value::Player(red));
    state
}
