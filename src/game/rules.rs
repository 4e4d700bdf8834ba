use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::types::{GameType, GridMove, Mark, TerminalResult};

/// Why a move was rejected. Rejection never mutates the board.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("position {position} is outside the {cells}-cell board")]
    OutOfRange { position: usize, cells: usize },
    #[error("position {position} is already occupied")]
    Occupied { position: usize },
}

/// Authoritative board state for one match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridState {
    /// Flat row-major board; `None` is an empty cell.
    pub cells: Vec<Option<Mark>>,
    pub side: usize,
    pub moves: u32,
}

impl GridState {
    /// Fresh empty board for the given game type.
    pub fn new(game_type: GameType) -> Self {
        let side = game_type.side();
        GridState {
            cells: vec![None; side * side],
            side,
            moves: 0,
        }
    }

    /// Validate and apply one move for `mark`.
    ///
    /// Returns the terminal result if this move ends the match, `None` while
    /// the match stays in progress. A rejected move leaves the state exactly
    /// as it was, so repeating an illegal move fails identically.
    pub fn apply(&mut self, mark: Mark, mv: &GridMove) -> Result<Option<TerminalResult>, MoveError> {
        let cells = self.cells.len();
        if mv.position >= cells {
            return Err(MoveError::OutOfRange {
                position: mv.position,
                cells,
            });
        }
        if self.cells[mv.position].is_some() {
            return Err(MoveError::Occupied { position: mv.position });
        }

        self.cells[mv.position] = Some(mark);
        self.moves += 1;

        if self.line_completed_by(mark) {
            return Ok(Some(TerminalResult::Win { winner: mark }));
        }
        if self.moves as usize == cells {
            return Ok(Some(TerminalResult::Draw));
        }
        Ok(None)
    }

    /// Re-check every row, column, and both diagonals for a full line of
    /// `mark`. Boards are small enough that the exhaustive scan is the
    /// simplest correct evaluation.
    fn line_completed_by(&self, mark: Mark) -> bool {
        let n = self.side;
        let at = |row: usize, col: usize| self.cells[row * n + col] == Some(mark);

        for row in 0..n {
            if (0..n).all(|col| at(row, col)) {
                return true;
            }
        }
        for col in 0..n {
            if (0..n).all(|row| at(row, col)) {
                return true;
            }
        }
        if (0..n).all(|i| at(i, i)) {
            return true;
        }
        (0..n).all(|i| at(i, n - 1 - i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(position: usize) -> GridMove {
        GridMove {
            position,
            symbol: None,
        }
    }

    /// Play a full line for X, interleaving O moves that never complete
    /// anything, and assert the win lands exactly on X's last placement.
    fn assert_line_wins(line: [usize; 3], o_moves: [usize; 2]) {
        let mut state = GridState::new(GameType::Grid3);
        assert_eq!(state.apply(Mark::X, &mv(line[0])), Ok(None));
        assert_eq!(state.apply(Mark::O, &mv(o_moves[0])), Ok(None));
        assert_eq!(state.apply(Mark::X, &mv(line[1])), Ok(None));
        assert_eq!(state.apply(Mark::O, &mv(o_moves[1])), Ok(None));
        assert_eq!(
            state.apply(Mark::X, &mv(line[2])),
            Ok(Some(TerminalResult::Win { winner: Mark::X }))
        );
    }

    #[test]
    fn test_all_eight_grid3_lines_win() {
        // Rows
        assert_line_wins([0, 1, 2], [3, 4]);
        assert_line_wins([3, 4, 5], [0, 1]);
        assert_line_wins([6, 7, 8], [0, 1]);
        // Columns
        assert_line_wins([0, 3, 6], [1, 2]);
        assert_line_wins([1, 4, 7], [0, 2]);
        assert_line_wins([2, 5, 8], [0, 1]);
        // Diagonals
        assert_line_wins([0, 4, 8], [1, 2]);
        assert_line_wins([2, 4, 6], [0, 1]);
    }

    #[test]
    fn test_win_not_reported_early() {
        let mut state = GridState::new(GameType::Grid3);
        assert_eq!(state.apply(Mark::X, &mv(0)), Ok(None));
        assert_eq!(state.apply(Mark::O, &mv(3)), Ok(None));
        assert_eq!(state.apply(Mark::X, &mv(1)), Ok(None));
    }

    #[test]
    fn test_draw_when_board_fills_without_line() {
        // X: 0 1 5 6 7  /  O: 2 3 4 8 — no three in a row anywhere.
        let mut state = GridState::new(GameType::Grid3);
        let plays = [
            (Mark::X, 0),
            (Mark::O, 2),
            (Mark::X, 1),
            (Mark::O, 3),
            (Mark::X, 5),
            (Mark::O, 4),
            (Mark::X, 6),
            (Mark::O, 8),
        ];
        for (mark, position) in plays {
            assert_eq!(state.apply(mark, &mv(position)), Ok(None));
        }
        assert_eq!(
            state.apply(Mark::X, &mv(7)),
            Ok(Some(TerminalResult::Draw))
        );
    }

    #[test]
    fn test_occupied_cell_rejected_without_mutation() {
        let mut state = GridState::new(GameType::Grid3);
        state.apply(Mark::X, &mv(4)).unwrap();
        let before = state.clone();

        for _ in 0..3 {
            assert_eq!(
                state.apply(Mark::O, &mv(4)),
                Err(MoveError::Occupied { position: 4 })
            );
            assert_eq!(state.cells, before.cells);
            assert_eq!(state.moves, before.moves);
        }
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut state = GridState::new(GameType::Grid3);
        assert_eq!(
            state.apply(Mark::X, &mv(9)),
            Err(MoveError::OutOfRange {
                position: 9,
                cells: 9
            })
        );
        assert!(state.cells.iter().all(Option::is_none));
    }

    /// Grid4 counterpart of `assert_line_wins`. O's three moves can never
    /// complete a four-cell line, so the win lands on X's last placement.
    fn assert_grid4_line_wins(line: [usize; 4], o_moves: [usize; 3]) {
        let mut state = GridState::new(GameType::Grid4);
        assert_eq!(state.apply(Mark::X, &mv(line[0])), Ok(None));
        assert_eq!(state.apply(Mark::O, &mv(o_moves[0])), Ok(None));
        assert_eq!(state.apply(Mark::X, &mv(line[1])), Ok(None));
        assert_eq!(state.apply(Mark::O, &mv(o_moves[1])), Ok(None));
        assert_eq!(state.apply(Mark::X, &mv(line[2])), Ok(None));
        assert_eq!(state.apply(Mark::O, &mv(o_moves[2])), Ok(None));
        assert_eq!(
            state.apply(Mark::X, &mv(line[3])),
            Ok(Some(TerminalResult::Win { winner: Mark::X }))
        );
    }

    #[test]
    fn test_grid4_row_column_and_anti_diagonal_win() {
        assert_grid4_line_wins([0, 1, 2, 3], [4, 5, 6]);
        assert_grid4_line_wins([0, 4, 8, 12], [1, 2, 3]);
        assert_grid4_line_wins([3, 6, 9, 12], [0, 1, 2]);
    }

    #[test]
    fn test_grid4_needs_four_in_a_row() {
        let mut state = GridState::new(GameType::Grid4);
        // Three on the main diagonal is not enough on a 4x4 board.
        assert_eq!(state.apply(Mark::X, &mv(0)), Ok(None));
        assert_eq!(state.apply(Mark::O, &mv(1)), Ok(None));
        assert_eq!(state.apply(Mark::X, &mv(5)), Ok(None));
        assert_eq!(state.apply(Mark::O, &mv(2)), Ok(None));
        assert_eq!(state.apply(Mark::X, &mv(10)), Ok(None));
        assert_eq!(state.apply(Mark::O, &mv(3)), Ok(None));
        assert_eq!(
            state.apply(Mark::X, &mv(15)),
            Ok(Some(TerminalResult::Win { winner: Mark::X }))
        );
    }
}
