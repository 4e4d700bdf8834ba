use actix::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::rules::GridState;
use crate::game::types::{GameType, GridMove, TerminalResult};
use crate::server::coordinator::store::ParticipantView;
use crate::server::coordinator::types::{ConnectionId, PlayerIdentity};

/// Client -> server events, as JSON text frames tagged by `action`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(
    tag = "action",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientWsMessage {
    JoinMatchmaking {
        game_type: GameType,
        player_identity: PlayerIdentity,
    },
    CancelMatchmaking,
    GameMove {
        match_id: Uuid,
        #[serde(rename = "move")]
        game_move: GridMove,
    },
    LeaveGame {
        match_id: Uuid,
    },
    RecoverSession {
        player_identity: PlayerIdentity,
        match_id: Uuid,
    },
}

/// Server -> client events. Doubles as the actor message delivered to the
/// session actor that owns the target socket.
#[derive(Message, Clone, Debug, Serialize, Deserialize)]
#[rtype(result = "()")]
#[serde(
    tag = "action",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerWsMessage {
    MatchFound {
        match_id: Uuid,
        game_type: GameType,
        participants: Vec<ParticipantView>,
        initial_state: GridState,
        current_turn: Option<Uuid>,
    },
    GameUpdate {
        state: GridState,
        last_move: GridMove,
        current_turn: Option<Uuid>,
        result: Option<TerminalResult>,
    },
    OpponentLeft {
        win_by_default: bool,
    },
    MatchExpired {
        match_id: Uuid,
    },
    MatchmakingTimedOut,
    RecoveryFailed {
        reason: String,
    },
    Error {
        message: String,
    },
}

/// A connection was accepted; the registry takes ownership of the transport.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub connection: ConnectionId,
    pub session: Recipient<ServerWsMessage>,
    pub close: Recipient<CloseSession>,
}

/// Tells a session actor to close its socket and stop. Sent when a newer
/// connection for the same player supersedes this one, so the old socket
/// does not linger until the client hangs up.
#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct CloseSession {
    pub reason: String,
}

/// The underlying transport closed (or a send to it failed).
#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub connection: ConnectionId,
}

/// A parsed client event, relayed by the owning session actor.
#[derive(Message)]
#[rtype(result = "()")]
pub struct ClientEvent {
    pub connection: ConnectionId,
    pub message: ClientWsMessage,
}

/// Result record handed to the optional persistence collaborator on any
/// terminal outcome. Fire-and-forget: delivery failure never rolls back
/// match state.
#[derive(Message, Clone, Debug, Serialize)]
#[rtype(result = "()")]
#[serde(rename_all = "camelCase")]
pub struct MatchConcluded {
    pub match_id: Uuid,
    pub game_type: GameType,
    pub participants: Vec<PlayerIdentity>,
    pub result: TerminalResult,
    pub forfeit: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::Mark;

    #[test]
    fn test_join_matchmaking_parses_wire_format() {
        let id = Uuid::new_v4();
        let text = format!(
            r#"{{"action":"join_matchmaking","data":{{"gameType":"grid3","playerIdentity":{{"id":"{}","displayName":"Alice"}}}}}}"#,
            id
        );
        let parsed: ClientWsMessage = serde_json::from_str(&text).unwrap();
        match parsed {
            ClientWsMessage::JoinMatchmaking {
                game_type,
                player_identity,
            } => {
                assert_eq!(game_type, GameType::Grid3);
                assert_eq!(player_identity.id, id);
                assert_eq!(player_identity.display_name, "Alice");
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_game_move_accepts_echoed_symbol() {
        let match_id = Uuid::new_v4();
        let text = format!(
            r#"{{"action":"game_move","data":{{"matchId":"{}","move":{{"position":4,"symbol":"X"}}}}}}"#,
            match_id
        );
        let parsed: ClientWsMessage = serde_json::from_str(&text).unwrap();
        match parsed {
            ClientWsMessage::GameMove {
                match_id: parsed_id,
                game_move,
            } => {
                assert_eq!(parsed_id, match_id);
                assert_eq!(game_move.position, 4);
                assert_eq!(game_move.symbol, Some(Mark::X));
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_cancel_matchmaking_parses_without_data() {
        let parsed: ClientWsMessage =
            serde_json::from_str(r#"{"action":"cancel_matchmaking"}"#).unwrap();
        assert!(matches!(parsed, ClientWsMessage::CancelMatchmaking));
    }

    #[test]
    fn test_game_update_serializes_camel_case() {
        let msg = ServerWsMessage::GameUpdate {
            state: GridState::new(GameType::Grid3),
            last_move: GridMove {
                position: 4,
                symbol: None,
            },
            current_turn: Some(Uuid::new_v4()),
            result: None,
        };
        let text = serde_json::to_string(&msg).unwrap();
        assert!(text.contains(r#""action":"game_update""#));
        assert!(text.contains(r#""currentTurn""#));
        assert!(text.contains(r#""lastMove""#));
        assert!(text.contains(r#""result":null"#));
    }
}
