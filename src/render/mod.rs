//! Read-only presentation: ASCII board snapshots and position notation.
//!
//! The core never formats output; this module consumes its snapshot
//! accessors. Entity glyphs come from the specification's presentation
//! profile: each display rule is an ordinary condition evaluated with the
//! entity bound, first match wins. A condition failure just means "rule
//! does not apply" - rendering can never reject a move or mutate anything.

use thiserror::Error;

use crate::core::{EntityId, GameState, Position};
use crate::expr::{evaluate, Context};
use crate::spec::Profile;

/// Glyph shown when no display rule matches an entity.
const UNKNOWN_GLYPH: &str = "?";

/// A position string the driver cannot use.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum NotationError {
    #[error("'{0}' is not a position (expected letter then number, like D3)")]
    BadFormat(String),

    #[error("position '{0}' is outside the board")]
    OutOfBounds(String),
}

/// Parse algebraic notation (`A1`, `d12`) into a board position.
///
/// Columns are letters from `A`, rows are 1-based numbers.
pub fn parse_position(text: &str, state: &GameState) -> Result<Position, NotationError> {
    let text = text.trim();
    let mut chars = text.chars();
    let column = chars
        .next()
        .filter(char::is_ascii_alphabetic)
        .ok_or_else(|| NotationError::BadFormat(text.to_string()))?;
    let row: String = chars.collect();
    let row: i32 = row
        .parse()
        .map_err(|_| NotationError::BadFormat(text.to_string()))?;

    let pos = Position::new(
        column.to_ascii_uppercase() as i32 - 'A' as i32,
        row - 1,
    );
    if !state.board.contains(pos) {
        return Err(NotationError::OutOfBounds(text.to_string()));
    }
    Ok(pos)
}

/// Format a position back into algebraic notation.
#[must_use]
pub fn format_position(pos: Position) -> String {
    let column = (b'A' + pos.x as u8) as char;
    format!("{}{}", column, pos.y + 1)
}

/// Pick the display glyph for an entity using a profile's display rules.
#[must_use]
pub fn asset_for_entity(state: &GameState, profile: &Profile, entity: EntityId) -> String {
    let ctx = Context::new(state).with_entity(entity);
    for rule in &profile.entity_assets {
        match evaluate(rule.condition.expr(), &ctx) {
            Ok(value) if value.is_truthy() => return rule.asset.clone(),
            // Not this rule - whether false or inapplicable.
            Ok(_) | Err(_) => {}
        }
    }
    UNKNOWN_GLYPH.to_string()
}

/// Render the board as ASCII, rows top-down from the far side.
#[must_use]
pub fn render_board(state: &GameState, profile: &Profile) -> String {
    let width = state.board.width();
    let height = state.board.height();
    let light = profile
        .topology_assets
        .get("empty_light_square")
        .map_or("  ", String::as_str);
    let dark = profile
        .topology_assets
        .get("empty_dark_square")
        .map_or("##", String::as_str);

    let mut out = String::new();
    let header: String = (0..width)
        .map(|x| format!(" {} ", (b'A' + x as u8) as char))
        .collect();
    out.push_str("  ");
    out.push_str(&header);
    out.push('\n');

    for y in (0..height).rev() {
        out.push_str(&format!("{:<2}", y + 1));
        for x in 0..width {
            let pos = Position::new(x, y);
            match state.board.occupant(pos) {
                Some(id) => {
                    out.push(' ');
                    out.push_str(&asset_for_entity(state, profile, id));
                    out.push(' ');
                }
                None => {
                    out.push_str(if (x + y) % 2 == 0 { light } else { dark });
                    out.push(' ');
                }
            }
        }
        out.push_str(&format!("{}\n", y + 1));
    }
    out.push_str("  ");
    out.push_str(&header);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Board, Player, PlayerId};
    use crate::rules::Condition;
    use crate::spec::{EntityAsset, Profile};
    use rustc_hash::FxHashMap;

    fn state() -> GameState {
        let players = vec![
            Player::new(PlayerId::new(0), "White"),
            Player::new(PlayerId::new(1), "Black"),
        ];
        GameState::new(players, Board::new(8, 8))
    }

    fn profile() -> Profile {
        Profile {
            entity_assets: vec![
                EntityAsset {
                    condition: Condition::compile("eq(entity.owner.name, 'White')").unwrap(),
                    asset: "W".into(),
                },
                EntityAsset {
                    condition: Condition::compile("eq(entity.owner.name, 'Black')").unwrap(),
                    asset: "B".into(),
                },
            ],
            topology_assets: FxHashMap::default(),
        }
    }

    #[test]
    fn test_parse_position() {
        let state = state();
        assert_eq!(parse_position("A1", &state), Ok(Position::new(0, 0)));
        assert_eq!(parse_position("d3", &state), Ok(Position::new(3, 2)));
        assert_eq!(parse_position("H8", &state), Ok(Position::new(7, 7)));
    }

    #[test]
    fn test_parse_position_rejects_garbage() {
        let state = state();
        assert!(matches!(
            parse_position("33", &state),
            Err(NotationError::BadFormat(_))
        ));
        assert!(matches!(
            parse_position("A", &state),
            Err(NotationError::BadFormat(_))
        ));
        assert!(matches!(
            parse_position("Z9", &state),
            Err(NotationError::OutOfBounds(_))
        ));
        assert!(matches!(
            parse_position("A9", &state),
            Err(NotationError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_notation_round_trip() {
        let state = state();
        for text in ["A1", "C4", "H8"] {
            let pos = parse_position(text, &state).unwrap();
            assert_eq!(format_position(pos), text);
        }
    }

    #[test]
    fn test_asset_selection_first_match() {
        let mut state = state();
        let white_piece = state.spawn(
            "Piece",
            Some(PlayerId::new(0)),
            Some(Position::new(0, 0)),
            FxHashMap::default(),
        );
        let black_piece = state.spawn(
            "Piece",
            Some(PlayerId::new(1)),
            Some(Position::new(1, 1)),
            FxHashMap::default(),
        );
        let unowned = state.spawn("Piece", None, Some(Position::new(2, 2)), FxHashMap::default());

        let profile = profile();
        assert_eq!(asset_for_entity(&state, &profile, white_piece), "W");
        assert_eq!(asset_for_entity(&state, &profile, black_piece), "B");
        // Owner is null: both rule conditions fail softly, fallback glyph.
        assert_eq!(asset_for_entity(&state, &profile, unowned), "?");
    }

    #[test]
    fn test_render_board_shows_pieces() {
        let mut state = state();
        state.spawn(
            "Piece",
            Some(PlayerId::new(0)),
            Some(Position::new(0, 0)),
            FxHashMap::default(),
        );

        let out = render_board(&state, &profile());
        assert!(out.contains('W'));
        assert!(out.lines().next().unwrap().contains('A'));
        // 8 ranks plus two header lines.
        assert_eq!(out.lines().count(), 10);
    }
}
