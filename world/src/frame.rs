//! Pure parsing of the turn-based wire protocol into [`GameMap`] snapshots.
//!
//! The protocol is line-oriented: an init handshake carries the player id,
//! the grid dimensions, and the production grid, and then every turn carries
//! one frame line with run-length-encoded owners followed by per-cell
//! strengths. Raw line I/O lives in the adapter; everything here is pure and
//! testable.

use fieldbot_core::{CellState, OwnerId};
use thiserror::Error;

use crate::GameMap;

/// Errors produced while decoding protocol lines.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// A token was not an integer fitting its field's range.
    #[error("expected an in-range integer token, found {0:?}")]
    InvalidToken(String),
    /// The line ended before the expected number of values was read.
    #[error("line ended before {expected} values were read")]
    Truncated {
        /// Number of values the line was expected to carry.
        expected: usize,
    },
    /// Owner run lengths did not tile the grid exactly.
    #[error("owner runs cover {covered} cells but the grid holds {expected}")]
    RunMismatch {
        /// Cells covered by the decoded runs.
        covered: usize,
        /// Cells the grid actually holds.
        expected: usize,
    },
    /// The production grid carried the wrong number of values.
    #[error("production grid holds {found} values, expected {expected}")]
    ProductionMismatch {
        /// Values present on the line.
        found: usize,
        /// Values required by the grid dimensions.
        expected: usize,
    },
}

/// Parses the next token into its field's exact width; values that do not
/// fit are rejected rather than truncated.
fn next_value<'a, I, T>(tokens: &mut I, expected: usize) -> Result<T, FrameError>
where
    I: Iterator<Item = &'a str>,
    T: std::str::FromStr,
{
    let token = tokens.next().ok_or(FrameError::Truncated { expected })?;
    token
        .parse::<T>()
        .map_err(|_| FrameError::InvalidToken(token.to_owned()))
}

/// Decodes the init line carrying this agent's player id.
pub fn parse_player_id(line: &str) -> Result<OwnerId, FrameError> {
    let mut tokens = line.split_whitespace();
    let id: u8 = next_value(&mut tokens, 1)?;
    Ok(OwnerId::new(id))
}

/// Decodes the init line carrying the grid dimensions.
pub fn parse_dimensions(line: &str) -> Result<(u16, u16), FrameError> {
    let mut tokens = line.split_whitespace();
    let width: u16 = next_value(&mut tokens, 2)?;
    let height: u16 = next_value(&mut tokens, 2)?;
    Ok((width, height))
}

/// Decodes the row-major production grid sent once during init.
pub fn parse_production(line: &str, width: u16, height: u16) -> Result<Vec<u8>, FrameError> {
    let expected = usize::from(width) * usize::from(height);
    let mut values = Vec::with_capacity(expected);
    for token in line.split_whitespace() {
        let value = token
            .parse::<u8>()
            .map_err(|_| FrameError::InvalidToken(token.to_owned()))?;
        values.push(value);
    }
    if values.len() != expected {
        return Err(FrameError::ProductionMismatch {
            found: values.len(),
            expected,
        });
    }
    Ok(values)
}

/// Decodes one turn frame into a complete [`GameMap`].
///
/// Owners arrive as `(count, owner)` run pairs tiling the grid in row-major
/// order, followed by one strength value per cell. Production comes from the
/// init handshake and is constant for the whole game.
pub fn parse_frame(
    line: &str,
    width: u16,
    height: u16,
    production: &[u8],
) -> Result<GameMap, FrameError> {
    let expected = usize::from(width) * usize::from(height);
    debug_assert_eq!(production.len(), expected, "production grid mismatch");

    let mut tokens = line.split_whitespace();
    let mut owners = Vec::with_capacity(expected);
    while owners.len() < expected {
        let count: usize = next_value(&mut tokens, expected)?;
        let owner = OwnerId::new(next_value(&mut tokens, expected)?);
        if owners.len() + count > expected {
            return Err(FrameError::RunMismatch {
                covered: owners.len() + count,
                expected,
            });
        }
        owners.extend(std::iter::repeat(owner).take(count));
    }

    let mut cells = Vec::with_capacity(expected);
    for (index, owner) in owners.into_iter().enumerate() {
        let strength: u8 = next_value(&mut tokens, expected)?;
        cells.push(CellState {
            owner,
            strength,
            production: production[index],
        });
    }

    Ok(GameMap::from_cells(width, height, cells))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldbot_core::CellCoord;

    #[test]
    fn init_lines_decode() {
        assert_eq!(parse_player_id("2"), Ok(OwnerId::new(2)));
        assert_eq!(parse_dimensions("30 25"), Ok((30, 25)));
        assert_eq!(
            parse_production("1 2 3 4 5 6", 3, 2),
            Ok(vec![1, 2, 3, 4, 5, 6])
        );
    }

    #[test]
    fn production_length_is_enforced() {
        assert_eq!(
            parse_production("1 2 3", 2, 2),
            Err(FrameError::ProductionMismatch {
                found: 3,
                expected: 4,
            })
        );
    }

    #[test]
    fn frame_runs_expand_row_major() {
        // 2x2 grid: three neutral cells then one cell owned by player 1.
        let production = [1, 1, 1, 1];
        let map = parse_frame("3 0 1 1 10 20 30 40", 2, 2, &production).expect("frame");

        assert_eq!(map.at(CellCoord::new(0, 0)).owner, OwnerId::NEUTRAL);
        assert_eq!(map.at(CellCoord::new(1, 0)).strength, 20);
        assert_eq!(map.at(CellCoord::new(1, 1)).owner, OwnerId::new(1));
        assert_eq!(map.at(CellCoord::new(1, 1)).strength, 40);
        assert_eq!(map.at(CellCoord::new(0, 1)).production, 1);
    }

    #[test]
    fn overlong_runs_are_rejected() {
        let production = [1, 1, 1, 1];
        assert_eq!(
            parse_frame("5 0 0 0 0 0", 2, 2, &production),
            Err(FrameError::RunMismatch {
                covered: 5,
                expected: 4,
            })
        );
    }

    #[test]
    fn truncated_strengths_are_rejected() {
        let production = [1, 1, 1, 1];
        assert_eq!(
            parse_frame("4 0 10 20 30", 2, 2, &production),
            Err(FrameError::Truncated { expected: 4 })
        );
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        assert_eq!(
            parse_dimensions("30 wide"),
            Err(FrameError::InvalidToken("wide".to_owned()))
        );
    }

    #[test]
    fn out_of_range_values_are_rejected_not_wrapped() {
        assert_eq!(
            parse_player_id("300"),
            Err(FrameError::InvalidToken("300".to_owned()))
        );
        assert_eq!(
            parse_production("1 2 300 4", 2, 2),
            Err(FrameError::InvalidToken("300".to_owned()))
        );

        let production = [1, 1, 1, 1];
        // Owner id past a byte.
        assert_eq!(
            parse_frame("4 256 10 20 30 40", 2, 2, &production),
            Err(FrameError::InvalidToken("256".to_owned()))
        );
        // Strength past the cap's storage width.
        assert_eq!(
            parse_frame("4 0 10 20 30 999", 2, 2, &production),
            Err(FrameError::InvalidToken("999".to_owned()))
        );
    }
}
