use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque id of one live WebSocket connection. Minted when the socket is
/// accepted; never reused after the connection closes.
pub type ConnectionId = Uuid;

/// Durable player id, issued by the authentication collaborator upstream.
/// Outlives any single connection.
pub type PlayerId = Uuid;

pub type MatchId = Uuid;

/// An already-authenticated player, as presented by the client in
/// matchmaking and recovery events. Immutable for the lifetime of a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerIdentity {
    pub id: PlayerId,
    pub display_name: String,
}
