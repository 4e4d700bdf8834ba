/// Presence map.
///
/// Tracks the last-known binding of a durable player identity to a match, so
/// a player who loses their connection can be routed back to the same match.
/// Records survive individual connection loss; the grace timers themselves
/// live on the coordinator, which owns all scheduling.
use log::debug;
use std::collections::HashMap;
use std::time::Instant;

use crate::server::coordinator::types::{MatchId, PlayerId};

#[derive(Clone, Debug)]
pub struct PresenceRecord {
    pub player: PlayerId,
    pub match_id: MatchId,
    pub last_seen: Instant,
}

#[derive(Default)]
pub struct PresenceManager {
    records: HashMap<PlayerId, PresenceRecord>,
}

impl PresenceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `player` to `match_id`. Supersedes any previous record.
    pub fn bind(&mut self, player: PlayerId, match_id: MatchId) {
        self.records.insert(
            player,
            PresenceRecord {
                player,
                match_id,
                last_seen: Instant::now(),
            },
        );
        debug!("[Presence] Player {} bound to match {}", player, match_id);
    }

    /// Match the player was last known to participate in.
    pub fn match_of(&self, player: PlayerId) -> Option<MatchId> {
        self.records.get(&player).map(|record| record.match_id)
    }

    /// Bump `last_seen` (on disconnect and on successful rebind).
    pub fn touch(&mut self, player: PlayerId) {
        if let Some(record) = self.records.get_mut(&player) {
            record.last_seen = Instant::now();
        }
    }

    /// Drop the record when the player's match ends or the player is
    /// garbage-collected. Idempotent.
    pub fn remove(&mut self, player: PlayerId) -> Option<PresenceRecord> {
        let removed = self.records.remove(&player);
        if let Some(record) = &removed {
            debug!(
                "[Presence] Record for player {} removed (match {})",
                record.player, record.match_id
            );
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_bind_and_lookup() {
        let mut presence = PresenceManager::new();
        let player = Uuid::new_v4();
        let match_id = Uuid::new_v4();

        assert!(presence.match_of(player).is_none());
        presence.bind(player, match_id);
        assert_eq!(presence.match_of(player), Some(match_id));
    }

    #[test]
    fn test_rebinding_supersedes_previous_record() {
        let mut presence = PresenceManager::new();
        let player = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        presence.bind(player, first);
        presence.bind(player, second);
        assert_eq!(presence.match_of(player), Some(second));
    }

    #[test]
    fn test_touch_moves_last_seen_forward() {
        let mut presence = PresenceManager::new();
        let player = Uuid::new_v4();
        presence.bind(player, Uuid::new_v4());

        let before = presence.records[&player].last_seen;
        presence.touch(player);
        assert!(presence.records[&player].last_seen >= before);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut presence = PresenceManager::new();
        let player = Uuid::new_v4();
        presence.bind(player, Uuid::new_v4());

        assert!(presence.remove(player).is_some());
        assert!(presence.remove(player).is_none());
        assert!(presence.match_of(player).is_none());
    }
}
