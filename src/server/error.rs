/// Client-facing error taxonomy for coordinator operations.
///
/// Every variant is recoverable: it is reported back to the originating
/// connection as an event and never corrupts shared state. Transport
/// failures are not represented here; a failed send is routed into the
/// disconnect path for the affected connection instead.
use thiserror::Error;
use uuid::Uuid;

use crate::game::rules::MoveError;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("player is already queued or in a match")]
    AlreadyQueued,
    #[error("match {0} not found")]
    MatchNotFound(Uuid),
    #[error("not your turn")]
    NotYourTurn,
    #[error("illegal move: {0}")]
    IllegalMove(#[from] MoveError),
    #[error("session recovery failed: {0}")]
    RecoveryFailed(&'static str),
}
