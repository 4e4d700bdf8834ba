/// Session store.
///
/// Authoritative map of active matches. A `Match` is owned exclusively by
/// this store from creation until removal; every mutation, including the
/// reaper's, goes through the store's own methods. Participants are bound to
/// connections by id only; swapping that id is all a reconnection does here.
use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::game::rules::GridState;
use crate::game::types::{GameType, GridMove, Mark, TerminalResult};
use crate::server::coordinator::types::{ConnectionId, MatchId, PlayerId, PlayerIdentity};
use crate::server::error::CoordinatorError;

/// One side of a match. The identity and mark never change; the connection
/// id is replaced on reconnection and cleared while the player is detached.
#[derive(Clone, Debug)]
pub struct Participant {
    pub identity: PlayerIdentity,
    pub connection: Option<ConnectionId>,
    pub mark: Mark,
}

/// One active two-player match.
#[derive(Debug)]
pub struct Match {
    pub id: MatchId,
    pub game_type: GameType,
    pub participants: [Participant; 2],
    pub state: GridState,
    /// `Some` exactly while the match is in progress.
    pub current_turn: Option<PlayerId>,
    pub created_at: Instant,
    pub last_activity: Instant,
    pub result: Option<TerminalResult>,
}

impl Match {
    fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            match_id: self.id,
            game_type: self.game_type,
            participants: self
                .participants
                .iter()
                .map(|p| ParticipantView {
                    identity: p.identity.clone(),
                    mark: p.mark,
                })
                .collect(),
            state: self.state.clone(),
            current_turn: self.current_turn,
            result: self.result,
        }
    }
}

/// Serializable participant view (no connection id; clients never see
/// transport-level identifiers).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub identity: PlayerIdentity,
    pub mark: Mark,
}

/// Read-only snapshot of a match, safe to hand to broadcast code.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSnapshot {
    pub match_id: MatchId,
    pub game_type: GameType,
    pub participants: Vec<ParticipantView>,
    pub state: GridState,
    pub current_turn: Option<PlayerId>,
    pub result: Option<TerminalResult>,
}

/// What a match removal settled: who won (or the already-known result), and
/// where to notify. `forfeited` is false when the match was already terminal
/// and the original result stands.
#[derive(Clone, Debug)]
pub struct ForfeitOutcome {
    pub match_id: MatchId,
    pub game_type: GameType,
    pub winner: PlayerIdentity,
    pub winner_connection: Option<ConnectionId>,
    pub participants: Vec<PlayerIdentity>,
    pub result: TerminalResult,
    pub forfeited: bool,
}

#[derive(Default)]
pub struct SessionStore {
    matches: HashMap<MatchId, Match>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a match from two paired queue entries, earlier-enqueued first.
    /// The first participant plays X; the starting turn is a fair coin flip.
    pub fn create_match(
        &mut self,
        game_type: GameType,
        first: (PlayerIdentity, ConnectionId),
        second: (PlayerIdentity, ConnectionId),
    ) -> MatchSnapshot {
        let id = Uuid::new_v4();
        let (a_identity, a_connection) = first;
        let (b_identity, b_connection) = second;
        let current_turn = if rand::rng().random_bool(0.5) {
            a_identity.id
        } else {
            b_identity.id
        };
        let now = Instant::now();
        let m = Match {
            id,
            game_type,
            participants: [
                Participant {
                    identity: a_identity,
                    connection: Some(a_connection),
                    mark: Mark::X,
                },
                Participant {
                    identity: b_identity,
                    connection: Some(b_connection),
                    mark: Mark::O,
                },
            ],
            state: GridState::new(game_type),
            current_turn: Some(current_turn),
            created_at: now,
            last_activity: now,
            result: None,
        };
        let snapshot = m.snapshot();
        info!(
            "[SessionStore] Match {} created ({:?}, {} vs {})",
            id, game_type, m.participants[0].identity.id, m.participants[1].identity.id
        );
        self.matches.insert(id, m);
        snapshot
    }

    /// Validate and apply one move from `connection`.
    ///
    /// Error ladder: unknown match, then the turn check (which also covers
    /// terminal matches, where nobody holds the turn, and connections not
    /// bound to any participant), then the rule engine. Rejections leave the
    /// match untouched.
    pub fn apply_move(
        &mut self,
        match_id: MatchId,
        connection: ConnectionId,
        mv: &GridMove,
    ) -> Result<(), CoordinatorError> {
        let m = self
            .matches
            .get_mut(&match_id)
            .ok_or(CoordinatorError::MatchNotFound(match_id))?;
        let mover = m
            .participants
            .iter()
            .find(|p| p.connection == Some(connection))
            .ok_or(CoordinatorError::NotYourTurn)?;
        if m.current_turn != Some(mover.identity.id) {
            return Err(CoordinatorError::NotYourTurn);
        }
        let mover_id = mover.identity.id;
        let mark = mover.mark;

        let result = m.state.apply(mark, mv)?;
        m.last_activity = Instant::now();
        match result {
            Some(result) => {
                m.result = Some(result);
                m.current_turn = None;
                info!("[SessionStore] Match {} finished: {:?}", match_id, result);
            }
            None => {
                m.current_turn = m
                    .participants
                    .iter()
                    .find(|p| p.identity.id != mover_id)
                    .map(|p| p.identity.id);
            }
        }
        Ok(())
    }

    /// Read-only snapshot of a match.
    pub fn get(&self, match_id: MatchId) -> Result<MatchSnapshot, CoordinatorError> {
        self.matches
            .get(&match_id)
            .map(Match::snapshot)
            .ok_or(CoordinatorError::MatchNotFound(match_id))
    }

    /// Connection ids of currently attached participants.
    pub fn connections(&self, match_id: MatchId) -> Vec<ConnectionId> {
        self.matches
            .get(&match_id)
            .map(|m| {
                m.participants
                    .iter()
                    .filter_map(|p| p.connection)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `player` participates in any stored match (terminal matches
    /// under retention included; the one-match-per-identity invariant holds
    /// until removal).
    pub fn contains_player(&self, player: PlayerId) -> bool {
        self.matches
            .values()
            .any(|m| m.participants.iter().any(|p| p.identity.id == player))
    }

    /// Clear the participant slot bound to `connection`, keeping the match
    /// alive for the grace window. Returns the affected match and player.
    pub fn detach_connection(&mut self, connection: ConnectionId) -> Option<(MatchId, PlayerId)> {
        for m in self.matches.values_mut() {
            if let Some(p) = m
                .participants
                .iter_mut()
                .find(|p| p.connection == Some(connection))
            {
                p.connection = None;
                debug!(
                    "[SessionStore] Player {} detached from match {}",
                    p.identity.id, m.id
                );
                return Some((m.id, p.identity.id));
            }
        }
        None
    }

    /// Bind `player` to a new connection. Only the connection id changes;
    /// state, marks, and turn are untouched. Returns the fresh snapshot and
    /// the connection id that was replaced, or `None` when the match or the
    /// participant is gone.
    pub fn rebind(
        &mut self,
        match_id: MatchId,
        player: PlayerId,
        connection: ConnectionId,
    ) -> Option<(MatchSnapshot, Option<ConnectionId>)> {
        let m = self.matches.get_mut(&match_id)?;
        let p = m
            .participants
            .iter_mut()
            .find(|p| p.identity.id == player)?;
        let replaced = p.connection.replace(connection);
        m.last_activity = Instant::now();
        info!(
            "[SessionStore] Player {} rebound to match {} on connection {}",
            player, match_id, connection
        );
        Some((m.snapshot(), replaced))
    }

    /// Remove a match, settling it against `losing_player`. If the match was
    /// still in progress the other participant wins by forfeit; an existing
    /// terminal result is left standing.
    pub fn remove_with_forfeit(
        &mut self,
        match_id: MatchId,
        losing_player: PlayerId,
    ) -> Option<ForfeitOutcome> {
        let m = self.matches.remove(&match_id)?;
        let winner = m
            .participants
            .iter()
            .find(|p| p.identity.id != losing_player)?;
        let forfeited = m.result.is_none();
        let result = m.result.unwrap_or(TerminalResult::Win {
            winner: winner.mark,
        });
        info!(
            "[SessionStore] Match {} removed ({}): {:?}",
            match_id,
            if forfeited { "forfeit" } else { "already terminal" },
            result
        );
        Some(ForfeitOutcome {
            match_id,
            game_type: m.game_type,
            winner: winner.identity.clone(),
            winner_connection: winner.connection,
            participants: m.participants.iter().map(|p| p.identity.clone()).collect(),
            result,
            forfeited,
        })
    }

    /// Explicit leave: settles the match in favor of the remaining
    /// participant. Idempotent; unknown matches and connections not bound to
    /// a participant are quiet no-ops.
    pub fn leave(&mut self, match_id: MatchId, connection: ConnectionId) -> Option<ForfeitOutcome> {
        let leaver = self.matches.get(&match_id)?.participants.iter().find_map(|p| {
            (p.connection == Some(connection)).then_some(p.identity.id)
        })?;
        self.remove_with_forfeit(match_id, leaver)
    }

    /// Remove a match without settling a result (retention expiry, reaper).
    pub fn remove(&mut self, match_id: MatchId) -> Option<Match> {
        let removed = self.matches.remove(&match_id);
        if let Some(m) = &removed {
            debug!(
                "[SessionStore] Match {} removed after {:?}",
                match_id,
                m.created_at.elapsed()
            );
        }
        removed
    }

    /// Matches whose last activity is older than `threshold`.
    pub fn idle_matches(&self, threshold: Duration) -> Vec<MatchId> {
        let now = Instant::now();
        self.matches
            .values()
            .filter(|m| now.duration_since(m.last_activity) > threshold)
            .map(|m| m.id)
            .collect()
    }
}
