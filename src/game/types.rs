use serde::{Deserialize, Serialize};

/// Supported game types. A match is bound to one variant at creation time
/// and dispatches to the matching rules for its whole lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    /// 3x3 board, three in a row wins.
    Grid3,
    /// 4x4 board, four in a row wins.
    Grid4,
}

impl GameType {
    /// Side length of the square board for this game type.
    pub fn side(&self) -> usize {
        match self {
            GameType::Grid3 => 3,
            GameType::Grid4 => 4,
        }
    }
}

/// A player's mark on the board. Doubles as the participant role: the
/// earlier-queued player is always X and moves are stamped with the mark
/// bound to the participant, never one claimed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

/// A single move: the flat index of the targeted cell. Clients may echo
/// their symbol; it is ignored (the engine derives the mark from the role).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridMove {
    pub position: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<Mark>,
}

/// Outcome of a finished match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TerminalResult {
    Win { winner: Mark },
    Draw,
}
